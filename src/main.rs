use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use gltf_bake::bake::{self, MeshNames};
use gltf_bake::{manifest, texture};

#[derive(Parser)]
#[command(name = "gltf-bake")]
#[command(about = "Bake glTF scenes into OBJ meshes, transform tables and TGA textures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake everything listed in a manifest
    Build {
        /// Path to the model's manifest
        #[arg(default_value = "bake.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write every mesh of a document as an OBJ file
    Obj {
        /// Input .gltf or .glb
        document: PathBuf,

        /// Binary buffer for a .gltf (default: <document>.bin)
        #[arg(long)]
        bin: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// File name pattern, `{}` is replaced by the mesh index
        #[arg(short, long, default_value = "mesh{}.obj")]
        name: String,
    },

    /// Print the world transforms of all mesh instances as a C array
    Transforms {
        /// Input .gltf or .glb
        document: PathBuf,

        /// Binary buffer for a .gltf (default: <document>.bin)
        #[arg(long)]
        bin: Option<PathBuf>,

        /// Keep every instance's transform, including repeats
        #[arg(long)]
        no_dedup: bool,

        /// Column width of each number
        #[arg(short, long, default_value_t = 10)]
        width: usize,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Flip, resize and write a texture as TGA
    Texture {
        /// Input PNG/JPG file
        input: PathBuf,

        /// Output .tga file (default: input with .tga extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Edge length of the square output
        #[arg(short, long, default_value_t = texture::DEFAULT_SIZE)]
        size: u32,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { manifest, output } => {
            tracing::info!("Building assets from {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::build_all(&config, output.as_deref())?;
            tracing::info!("Build complete!");
        }

        Commands::Obj {
            document,
            bin,
            output,
            name,
        } => {
            let loaded = bake::load_document(&document, bin.as_deref())?;
            let names = MeshNames::Pattern { pattern: name };
            let written = bake::export_meshes(&loaded, &output, &names)?;
            tracing::info!("Wrote {} meshes", written.len());
        }

        Commands::Transforms {
            document,
            bin,
            no_dedup,
            width,
            output,
        } => {
            let loaded = bake::load_document(&document, bin.as_deref())?;
            let table = bake::export_transforms(&loaded, !no_dedup, width)?;
            match output {
                Some(output) => std::fs::write(&output, table)
                    .with_context(|| format!("Failed to write transforms: {:?}", output))?,
                None => print!("{table}"),
            }
        }

        Commands::Texture {
            input,
            output,
            size,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("tga"));
            texture::convert_file(&input, &output, size)?;
        }
    }

    Ok(())
}
