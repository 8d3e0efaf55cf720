//! ALICE-Arith CLI
//!
//! Command-line interface for ALICE-Arith compression.

use alice_arith::{ArithCodec, CodecConfig, ContainerIndex, DEFAULT_BLOCK_SIZE};
use clap::{Parser, Subcommand};
use memmap2::Mmap;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "alice-arith")]
#[command(author = "Moroya Sakamoto")]
#[command(version = "1.0.0")]
#[command(about = "Adaptive binary arithmetic coding with parallel block compression")]
#[command(long_about = r#"
ALICE-Arith: Adaptive Binary Arithmetic Coding

Principle:
  Input Bytes → Blocks → Context Model P(bit|last 16 bits)
    → Arithmetic Coder narrows [low, high] per bit
    → Blocks compressed in parallel, concatenated behind a size table
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    Compress {
        /// Input file (use - for stdin)
        input: PathBuf,

        /// Output file (default: input.aac)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Block size in bytes
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,

        /// Background worker threads (default: cores - 1)
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// JSON config file (overrides --block-size/--workers)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decompress a file
    Decompress {
        /// Input file (.aac)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show file information
    Info {
        /// Input file (.aac)
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify a compressed file
    Verify {
        /// Input file (.aac)
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compress {
            input,
            output,
            block_size,
            workers,
            config,
            verbose,
        } => {
            let config = match config {
                Some(path) => CodecConfig::from_json(&fs::read_to_string(path)?)?,
                None => CodecConfig {
                    block_size,
                    workers,
                },
            };
            compress_file(&input, output, config, verbose)?;
        }
        Commands::Decompress { input, output } => {
            decompress_file(&input, output)?;
        }
        Commands::Info { input, json } => {
            show_info(&input, json)?;
        }
        Commands::Verify { input } => {
            verify_file(&input)?;
        }
    }

    Ok(())
}

/// Input bytes: memory mapped for files, buffered for stdin
enum Input {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Input {
    fn open(path: &Path) -> io::Result<Self> {
        if path.to_string_lossy() == "-" {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            return Ok(Self::Buffered(buffer));
        }

        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            // Zero-length files cannot be mapped on every platform
            return Ok(Self::Buffered(Vec::new()));
        }
        // SAFETY: the map is read-only and dropped before the command returns
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self::Mapped(mmap))
    }

    fn as_slice(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Buffered(buffer) => buffer,
        }
    }
}

fn compress_file(
    input: &Path,
    output: Option<PathBuf>,
    config: CodecConfig,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = Input::open(input)?;
    let data = data.as_slice();

    let start = Instant::now();
    let mut codec = ArithCodec::new(config)?;
    let compressed = codec.compress(data)?;
    let elapsed = start.elapsed();

    // Write output
    let output_path = output.unwrap_or_else(|| {
        let mut p = input.to_path_buf();
        p.set_extension("aac");
        p
    });

    fs::write(&output_path, &compressed)?;

    let stats = codec.last_stats().cloned().ok_or("no statistics recorded")?;
    let ratio = stats.compression_ratio() * 100.0;
    let savings = stats.space_savings() * 100.0;

    if verbose {
        println!("ALICE-Arith Compression");
        println!("=======================");
        println!("Input:      {}", input.display());
        println!("Output:     {}", output_path.display());
        println!("Block Size: {} bytes", stats.block_size);
        println!("Blocks:     {}", stats.block_count);
        println!("Workers:    {} + caller", config.worker_count());
        println!();
        println!("Original:   {} bytes", stats.original_size);
        println!("Compressed: {} bytes", stats.compressed_size);
        println!("Ratio:      {:.1}%", ratio);
        println!("Savings:    {:.1}%", savings);
        println!("Bits/Byte:  {:.3}", stats.bits_per_byte());
        println!("Time:       {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    } else {
        println!(
            "{} -> {} ({:.1}% ratio, {:.1}% saved)",
            input.display(),
            output_path.display(),
            ratio,
            savings
        );
    }

    Ok(())
}

fn decompress_file(input: &Path, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let compressed = Input::open(input)?;

    let codec = ArithCodec::new(CodecConfig::default())?;
    let data = codec.decompress(compressed.as_slice())?;

    if let Some(output_path) = output {
        fs::write(&output_path, &data)?;
        println!("Decompressed to: {}", output_path.display());
    } else {
        io::stdout().write_all(&data)?;
    }

    Ok(())
}

#[derive(Serialize)]
struct BlockInfo {
    index: usize,
    compressed_size: usize,
    original_size: u64,
}

#[derive(Serialize)]
struct FileInfo {
    file: String,
    compressed_size: usize,
    original_size: u64,
    block_count: usize,
    blocks: Vec<BlockInfo>,
}

fn show_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let compressed = Input::open(input)?;
    let compressed = compressed.as_slice();

    let index = ContainerIndex::parse(compressed)?;
    let mut blocks = Vec::with_capacity(index.block_count());
    for (i, size) in index.block_sizes().enumerate() {
        blocks.push(BlockInfo {
            index: i,
            compressed_size: size,
            original_size: index.original_len(compressed, i)?,
        });
    }

    let info = FileInfo {
        file: input.display().to_string(),
        compressed_size: compressed.len(),
        original_size: index.original_size(compressed)?,
        block_count: index.block_count(),
        blocks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("ALICE-Arith File Information");
    println!("============================");
    println!("File:            {}", info.file);
    println!("Compressed Size: {} bytes", info.compressed_size);
    println!("Original Size:   {} bytes", info.original_size);
    println!("Blocks:          {}", info.block_count);
    if info.original_size > 0 {
        let ratio = info.compressed_size as f64 / info.original_size as f64 * 100.0;
        println!("Ratio:           {:.1}%", ratio);
    }

    if !info.blocks.is_empty() {
        println!();
        println!("  {:>6}  {:>12}  {:>12}", "Block", "Compressed", "Original");
        for block in &info.blocks {
            println!(
                "  {:>6}  {:>12}  {:>12}",
                block.index, block.compressed_size, block.original_size
            );
        }
    }

    Ok(())
}

fn verify_file(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let compressed = Input::open(input)?;

    let codec = ArithCodec::new(CodecConfig::default())?;

    print!("Verifying {}... ", input.display());
    io::stdout().flush()?;

    match codec.decompress(compressed.as_slice()) {
        Ok(data) => {
            println!("OK ({} bytes decompressed)", data.len());
        }
        Err(e) => {
            println!("FAILED");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
