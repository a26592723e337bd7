//! Line-oriented operator CLI: a thin REPL for driving an executor by hand.
//! Kept to plain `std::io::stdin` line reading rather than a readline
//! crate — this tool is for poking at a running executor interactively,
//! not for scripting, so history and completion add nothing.
//!
//! Commands:
//!   submit <task_id> <prio> <data>   send one request frame
//!   connect <addr:port>              (re)connect to a different executor
//!   help                             show this message
//!   quit                             exit

use std::io::{self, BufRead, Write};
use std::net::TcpStream;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ros-cli", about = "Line-oriented operator CLI for rosexec")]
struct Args {
    /// Address of the executor's listener to connect to at startup.
    #[arg(long, default_value = "127.0.0.1:4290")]
    connect: String,
}

fn main() {
    let args = Args::parse();
    let mut stream = match TcpStream::connect(&args.connect) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("warning: could not connect to {}: {e}", args.connect);
            None
        }
    };

    println!("rosexec operator CLI. Type 'help' for commands.");
    let stdin = io::stdin();
    let mut out = io::stdout();

    loop {
        print!("ros> ");
        let _ = out.flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["quit"] | ["exit"] => break,
            ["help"] => print_help(),
            ["connect", addr] => match TcpStream::connect(addr) {
                Ok(s) => {
                    println!("connected to {addr}");
                    stream = Some(s);
                }
                Err(e) => eprintln!("connect failed: {e}"),
            },
            ["submit", task_id, prio, data] => {
                submit(&mut stream, task_id, prio, data);
            }
            _ => eprintln!("unrecognized command {line:?}; type 'help'"),
        }
    }
}

fn submit(stream: &mut Option<TcpStream>, task_id: &str, prio: &str, data: &str) {
    let Some(conn) = stream.as_mut() else {
        eprintln!("not connected; use 'connect <addr:port>' first");
        return;
    };

    let parsed = (|| -> Result<[u8; 3], std::num::ParseIntError> {
        Ok([task_id.parse()?, prio.parse()?, data.parse()?])
    })();

    match parsed {
        Ok(bytes) => match conn.write_all(&bytes) {
            Ok(()) => println!("submitted {{{}, {}, {}}}", bytes[0], bytes[1], bytes[2]),
            Err(e) => eprintln!("write failed: {e}"),
        },
        Err(e) => eprintln!("bad frame: {e}"),
    }
}

fn print_help() {
    println!(
        "commands:\n  \
         submit <task_id> <prio> <data>   send one request frame\n  \
         connect <addr:port>              (re)connect to a different executor\n  \
         help                             show this message\n  \
         quit                             exit"
    );
}
