use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;
use ropdf::{Document, Object};

#[derive(Parser, Debug)]
#[command(version, about = "Inspect the structure of a PDF document")]
struct Args {
    /// Path to the PDF file.
    file: PathBuf,

    /// User or owner password for encrypted files.
    #[arg(short, long)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Version, security status, permissions and the trailer.
    Info,
    /// List every object version in the cross reference chain.
    Objects,
    /// Print one object; with --decode, write its decoded stream data instead.
    Object {
        number: u32,
        #[arg(default_value_t = 0)]
        generation: u16,
        #[arg(long)]
        decode: bool,
    },
    /// Describe a page (0-based); with --ops, print its content operations.
    Page {
        index: usize,
        #[arg(long)]
        ops: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    info!("Open {}", args.file.display());
    let document = Document::open(&args.file, args.password.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Info => {
            writeln!(out, "Version:     {}", document.version())?;
            writeln!(out, "Security:    {:?}", document.decryption_status())?;
            writeln!(out, "Permissions: {:?}", document.permissions())?;
            writeln!(out, "Pages:       {}", document.page_count())?;
            writeln!(out, "Objects:     {}", document.object_table().len())?;
            if document.is_invalid() {
                writeln!(out, "Warning:     some objects could not be read")?;
            }
            writeln!(out, "Trailer:     {}", String::from_utf8_lossy(&document.trailer().to_bytes()))?;
            if let Some(info) = document.info() {
                for (key, value) in info {
                    let text = match value {
                        Object::String(..) => value.as_text()?,
                        _ => String::from_utf8_lossy(&value.to_bytes()).into_owned(),
                    };
                    writeln!(out, "  {}: {}", String::from_utf8_lossy(key), text)?;
                }
            }
        }
        Command::Objects => {
            for object in document.objects() {
                write!(out, "{:>6} {:<5} {:<10}", object.id.0, object.id.1, object.description())?;
                if let Some(type_name) = object.type_name() {
                    write!(out, " /{}", type_name)?;
                }
                if object.is_stream() {
                    write!(out, " ({} bytes)", object.stream_length())?;
                }
                writeln!(out, " @ {:?}", object.location)?;
            }
        }
        Command::Object { number, generation, decode } => {
            let id = (number, generation);
            if decode {
                out.write_all(&document.decoded_stream(id)?.data)?;
            } else {
                let object = document.resolve(id)?;
                out.write_all(&object.value.to_bytes())?;
                if object.is_stream() {
                    writeln!(out, "\nstream ({} bytes)", object.stream_length())?;
                } else {
                    writeln!(out)?;
                }
            }
        }
        Command::Page { index, ops } => {
            if ops {
                out.write_all(&document.page_operations(index)?.encode()?)?;
            } else {
                let page = document.page(index)?;
                writeln!(out, "Object:   {} {} R", page.id.0, page.id.1)?;
                writeln!(out, "Rotate:   {}", page.rotate())?;
                writeln!(out, "Contents: {:?}", page.contents)?;
                out.write_all(&page.dict.to_bytes())?;
                writeln!(out)?;
                out.write_all(document.page_content(index)?)?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
