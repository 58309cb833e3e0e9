use rayon::prelude::*;
use std::num::NonZeroUsize;
use tracing::trace;

use super::matcher::KeywordMatcher;
use crate::errors::ScanResult;

/// Where echoed match lines say they came from
#[derive(Debug, Clone, Copy)]
pub enum MatchOrigin {
    /// A single-process scan
    Local,
    /// One process of a multi-process run
    Rank(usize),
}

/// Counts matching lines across a dedicated thread pool.
///
/// The line slice is cut into at most `threads` contiguous chunks of equal
/// size, fixed up front; each chunk is scanned sequentially by one execution
/// unit and the per-chunk counts are summed. The reduction is associative
/// and touches no shared state, so the total is identical for every thread
/// count.
#[derive(Debug)]
pub struct LocalScanner {
    matcher: KeywordMatcher,
    pool: rayon::ThreadPool,
    threads: usize,
    echo: Option<MatchOrigin>,
}

impl LocalScanner {
    /// Builds a scanner with its own pool of `threads` threads
    pub fn new(matcher: KeywordMatcher, threads: NonZeroUsize) -> ScanResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.get())
            .build()?;
        Ok(Self {
            matcher,
            pool,
            threads: threads.get(),
            echo: None,
        })
    }

    /// Prints every matching line as it is found, tagged with its origin
    pub fn echo_matches(mut self, origin: MatchOrigin) -> Self {
        self.echo = Some(origin);
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Counts the lines containing the keyword
    pub fn count(&self, lines: &[String]) -> u64 {
        if lines.is_empty() {
            return 0;
        }

        let chunk_size = lines.len().div_ceil(self.threads);
        self.pool.install(|| {
            lines
                .par_chunks(chunk_size)
                .map(|chunk| self.count_chunk(chunk))
                .sum()
        })
    }

    fn count_chunk(&self, lines: &[String]) -> u64 {
        let mut matching = 0;
        for line in lines {
            if self.matcher.is_match(line) {
                matching += 1;
                // One println per line keeps concurrent echoes whole
                match self.echo {
                    Some(MatchOrigin::Local) => println!("[match] {line}"),
                    Some(MatchOrigin::Rank(rank)) => println!("[match rank {rank}] {line}"),
                    None => {}
                }
            }
        }
        trace!("Scanned chunk of {} lines, {} matched", lines.len(), matching);
        matching
    }
}
