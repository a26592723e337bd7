//! Request-generator client: connects to the executor's listener and sends
//! one or more 3-byte `(task_id, priority, data)` frames, either given
//! explicitly on the command line or generated randomly for load testing.
//! Grounded on `ros_request_simulator.c`'s `get_connected_socket` +
//! random-delay send loop.

use std::io::Write;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use clap::Parser;
use rand::Rng;

/// One explicit frame given on the command line, parsed as `id:prio:data`.
#[derive(Debug, Clone)]
struct Frame {
    task_id: u8,
    prio: u8,
    data: u8,
}

impl std::str::FromStr for Frame {
    type Err = String;

    fn from_str(s: &str) -> Result<Frame, String> {
        let mut parts = s.split(':');
        let err = || format!("expected id:prio:data, got {s:?}");
        let task_id = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let prio = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let data = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        Ok(Frame {
            task_id,
            prio,
            data,
        })
    }
}

#[derive(Parser, Debug)]
#[command(name = "ros-client", about = "Request-generator client for rosexec")]
struct Args {
    /// Address of the executor's listener.
    #[arg(long, default_value = "127.0.0.1")]
    addr: String,

    /// Port of the executor's listener.
    #[arg(long, default_value_t = 4290)]
    port: u16,

    /// Explicit frames to send, each formatted `id:prio:data`. If omitted,
    /// `--random` random frames are sent instead.
    frames: Vec<Frame>,

    /// Number of random frames to send when no explicit frames are given.
    #[arg(long, default_value_t = 0)]
    random: usize,

    /// Upper bound (exclusive) on the random task_id generated with `--random`.
    #[arg(long, default_value_t = 4)]
    random_tasks: u8,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    let mut stream = TcpStream::connect((args.addr.as_str(), args.port))?;

    if !args.frames.is_empty() {
        for frame in &args.frames {
            send(&mut stream, frame)?;
        }
        return Ok(());
    }

    let mut rng = rand::thread_rng();
    for _ in 0..args.random {
        let frame = Frame {
            task_id: rng.gen_range(0..args.random_tasks.max(1)),
            prio: rng.gen(),
            data: rng.gen(),
        };
        let delay_us = rng.gen_range(5_000..100_000);
        thread::sleep(Duration::from_micros(delay_us));
        send(&mut stream, &frame)?;
    }

    Ok(())
}

fn send(stream: &mut TcpStream, frame: &Frame) -> std::io::Result<()> {
    let bytes = [frame.task_id, frame.prio, frame.data];
    stream.write_all(&bytes)?;
    println!("sent {{{}, {}, {}}}", frame.task_id, frame.prio, frame.data);
    Ok(())
}
