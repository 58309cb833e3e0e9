use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream};
use tracing::{debug, trace};

use super::protocol::{self, PROTOCOL_VERSION};
use crate::errors::{ScanError, ScanResult};

/// A buffered two-way connection to one peer
#[derive(Debug)]
struct Channel {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Channel {
    fn new(stream: TcpStream) -> ScanResult<Self> {
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            reader,
            writer: BufWriter::new(stream),
        })
    }

    fn send_u64(&mut self, value: u64) -> ScanResult<()> {
        protocol::write_u64(&mut self.writer, value)?;
        Ok(())
    }

    fn recv_u64(&mut self) -> ScanResult<u64> {
        Ok(protocol::read_u64(&mut self.reader)?)
    }

    fn send_frame(&mut self, payload: &[u8]) -> ScanResult<()> {
        protocol::write_frame(&mut self.writer, payload)
    }

    fn recv_frame(&mut self) -> ScanResult<Vec<u8>> {
        protocol::read_frame(&mut self.reader)
    }

    /// Pushes buffered writes out before the peer is expected to act on them
    fn flush(&mut self) -> ScanResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// The coordinator's side of the cluster: one channel per worker rank.
///
/// All operations are blocking and run over plain point-to-point byte
/// streams. Bytes on one channel arrive in send order, which is the only
/// ordering the pipeline relies on; channels say nothing about each other.
#[derive(Debug)]
pub struct CoordinatorLinks {
    // links[i] talks to rank i + 1
    links: Vec<Channel>,
}

impl CoordinatorLinks {
    /// Accepts and verifies one connection per worker rank.
    ///
    /// Every worker introduces itself with the protocol version and its
    /// rank. A version mismatch, an out-of-range rank, or a rank that
    /// already connected all abort the run.
    pub fn accept(listener: &TcpListener, world_size: usize) -> ScanResult<Self> {
        let expected = world_size - 1;
        let mut slots: Vec<Option<Channel>> = (0..expected).map(|_| None).collect();
        let mut connected = 0;

        while connected < expected {
            let (stream, peer) = listener.accept()?;
            let mut channel = Channel::new(stream)?;

            let version = channel.recv_u64()?;
            if version != PROTOCOL_VERSION {
                return Err(ScanError::protocol(format!(
                    "worker at {peer} speaks protocol version {version}, expected {PROTOCOL_VERSION}"
                )));
            }
            let rank = channel.recv_u64()? as usize;
            if rank == 0 || rank >= world_size {
                return Err(ScanError::protocol(format!(
                    "worker at {peer} announced rank {rank}, valid ranks are 1..{world_size}"
                )));
            }
            let slot = &mut slots[rank - 1];
            if slot.is_some() {
                return Err(ScanError::protocol(format!(
                    "rank {rank} connected twice, second time from {peer}"
                )));
            }

            debug!("Worker rank {} connected from {}", rank, peer);
            *slot = Some(channel);
            connected += 1;
        }

        Ok(Self {
            links: slots.into_iter().flatten().collect(),
        })
    }

    /// Number of worker channels, one less than the world size
    pub fn worker_count(&self) -> usize {
        self.links.len()
    }

    /// Tells every worker how many lines the run has in total, so each can
    /// derive its own partition locally.
    pub fn broadcast_line_count(&mut self, nlines: u64) -> ScanResult<()> {
        debug!("Broadcasting line count {} to {} workers", nlines, self.links.len());
        for channel in &mut self.links {
            channel.send_u64(nlines)?;
            channel.flush()?;
        }
        Ok(())
    }

    /// Streams a worker's shard to it, one frame per line, in file order
    pub fn send_shard(&mut self, rank: usize, lines: &[String]) -> ScanResult<()> {
        trace!("Sending {} lines to rank {}", lines.len(), rank);
        let channel = &mut self.links[rank - 1];
        for line in lines {
            channel.send_frame(line.as_bytes())?;
        }
        channel.flush()?;
        Ok(())
    }

    /// Collects one local count per worker and folds in the coordinator's
    /// own. Receives block until each worker has finished its scan, which
    /// is the only barrier the pipeline needs.
    pub fn reduce_counts(&mut self, own_count: u64) -> ScanResult<u64> {
        let mut total = own_count;
        for (index, channel) in self.links.iter_mut().enumerate() {
            let count = channel.recv_u64()?;
            trace!("Rank {} reported {} matching lines", index + 1, count);
            total += count;
        }
        Ok(total)
    }
}

/// A worker's single channel back to the coordinator
#[derive(Debug)]
pub struct WorkerLink {
    channel: Channel,
    rank: usize,
}

impl WorkerLink {
    /// Connects to the coordinator and introduces this rank
    pub fn connect(coordinator: &str, rank: usize) -> ScanResult<Self> {
        let stream = TcpStream::connect(coordinator)?;
        let mut channel = Channel::new(stream)?;
        channel.send_u64(PROTOCOL_VERSION)?;
        channel.send_u64(rank as u64)?;
        channel.flush()?;
        debug!("Rank {} connected to coordinator at {}", rank, coordinator);
        Ok(Self { channel, rank })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Receives the broadcast total line count
    pub fn recv_line_count(&mut self) -> ScanResult<u64> {
        self.channel.recv_u64()
    }

    /// Receives this rank's shard, exactly `expected` lines.
    ///
    /// The caller derives `expected` from the broadcast line count with the
    /// same arithmetic the coordinator uses, so the shard length never has
    /// to travel over the wire.
    pub fn recv_shard(&mut self, expected: usize) -> ScanResult<Vec<String>> {
        let mut lines = Vec::with_capacity(expected);
        for _ in 0..expected {
            let payload = self.channel.recv_frame()?;
            let line = String::from_utf8(payload).map_err(|e| {
                ScanError::protocol(format!(
                    "rank {}: line frame is not valid UTF-8: {e}",
                    self.rank
                ))
            })?;
            lines.push(line);
        }
        debug!("Rank {} received shard of {} lines", self.rank, lines.len());
        Ok(lines)
    }

    /// Reports this rank's local count back to the coordinator
    pub fn send_count(&mut self, count: u64) -> ScanResult<()> {
        self.channel.send_u64(count)?;
        self.channel.flush()
    }
}
