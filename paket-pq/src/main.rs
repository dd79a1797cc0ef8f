mod parser;

use paket::{unpack, Packer, Unpacker};
use std::io::{self, Read, Write};
use anyhow::{bail, Context, Result};
use structopt::StructOpt;
use std::str::from_utf8;

/// Decode and print paket messages
#[derive(StructOpt)]
#[structopt(name = "pq")]
struct Opt {
    /// parse a textual representation and encode it into a binary paket instead
    #[structopt(short, long)]
    encode: bool,
    /// decode a whole stream of messages instead of a single one
    #[structopt(short, long)]
    stream: bool,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer).context("Failed to read stdin")?;
    if opt.encode {
        encode(&buffer)
    } else if opt.stream {
        stream(&buffer)
    } else {
        print(&buffer)
    }
}

fn print(buffer: &[u8]) -> Result<()> {
    let value = unpack(buffer).context("Decoding error")?;
    println!("{}", &value);
    Ok(())
}

fn stream(buffer: &[u8]) -> Result<()> {
    let mut unpacker = Unpacker::new();
    unpacker.feed(buffer).context("Decoding error")?;
    while let Some(value) = unpacker.next_value().context("Decoding error")? {
        println!("{}", &value);
    }
    if unpacker.buffered() > 0 {
        bail!("{} bytes of trailing garbage at input position {}", unpacker.buffered(), unpacker.position());
    }
    Ok(())
}

fn encode(buffer: &[u8]) -> Result<()> {
    let string = from_utf8(buffer).context("input is not utf-8")?;
    let value = parser::parse(string)?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    Packer::encode(&value, &mut handle).context("Encoding error")?;
    handle.flush()?;
    Ok(())
}
