#[macro_use]
extern crate clap;

use clap::Arg;
use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process;

use austro_asm::Assembled;

#[derive(Debug)]
enum IOErrorContext {
    ReadInput,
}

#[derive(Debug)]
enum Error {
    Asm(austro_asm::Error),
    Io(io::Error, IOErrorContext, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, context, path) => writeln!(
                f,
                "{} \"{}\" failed: {}",
                match context {
                    IOErrorContext::ReadInput => "reading input",
                },
                path.display(),
                err
            ),
            Error::Asm(err) => write!(f, "assembling input failed: {}", err),
        }
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Assembly source file to read; reads standard input if omitted")
                .index(1),
        )
        .get_matches();

    if let Err(err) = austro(matches.value_of("INPUT")) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn austro(input: Option<&str>) -> Result<(), Error> {
    let source = read_source(input)?;
    let assembled = austro_asm::assemble(&source).map_err(Error::Asm)?;
    print_assembled(&assembled);
    Ok(())
}

fn read_source(input: Option<&str>) -> Result<String, Error> {
    let mut source = String::new();
    match input {
        Some(path_str) => {
            let path = Path::new(path_str);
            let file = File::open(path)
                .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, path.to_owned()))?;
            BufReader::new(file)
                .read_to_string(&mut source)
                .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, path.to_owned()))?;
        }
        None => {
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|err| Error::Io(err, IOErrorContext::ReadInput, PathBuf::from("<stdin>")))?;
        }
    }
    Ok(source)
}

/// Prints one line per assembled word — its address, tag, and raw fields —
/// followed by the label table, in source order.
fn print_assembled(assembled: &Assembled) {
    for (address, word) in assembled.words.iter().enumerate() {
        if word.is_instruction() {
            println!(
                "{:>4}  instr  opcode={:#07b} flags={:#05b} operand={:#04x}  (line {})",
                address,
                word.opcode(),
                word.flags(),
                word.operand(),
                word.lineno()
            );
        } else {
            println!("{:>4}  data   value={:#06x}", address, word.value());
        }
    }

    if assembled.labels.is_empty() {
        return;
    }
    println!();
    println!("labels:");
    let mut labels: Vec<(&String, &u16)> = assembled.labels.iter().collect();
    labels.sort_by_key(|(_, address)| **address);
    for (name, address) in labels {
        println!("  {:>4}  {}", address, name);
    }
}
