//! # Sparse Voxel Octree Baker
//!
//! Bakes a point-cloud model into the two storage buffers read by the
//! ray-marching kernel:
//!
//! - `octree.bin`: flattened records, 60 bytes each
//! - `palette.bin`: materials, 12 bytes each (RGB `f32`)
//!
//! ## Usage
//!
//! ```bash
//! svo_bake assets/models/castle.ply --out-dir baked/ --check --print 9
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use nubila_svo::{BakeConfig, BakedModel};

/// Sparse voxel octree baker.
#[derive(Parser, Debug)]
#[command(name = "svo_bake")]
#[command(about = "Bakes a point-cloud model into flattened octree and palette buffers")]
struct Args {
    /// Point-cloud model file (ASCII .ply).
    model: PathBuf,

    /// Path to configuration TOML file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for octree.bin and palette.bin.
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Print the first N flattened records.
    #[arg(long, value_name = "N")]
    print: Option<usize>,

    /// Verify the record links before writing.
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BakeConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => BakeConfig::default(),
    };

    println!("Loading model from: {}", args.model.display());
    let baked = BakedModel::load(&args.model, config)
        .with_context(|| format!("Failed to bake model: {}", args.model.display()))?;

    let [width, height, depth] = baked.dimensions();
    println!("Dimensions: {width} x {height} x {depth}");
    println!(
        "Octree: size {}, {} records ({} bytes)",
        baked.octree().size(),
        baked.record_count(),
        baked.octree_bytes().len()
    );
    println!(
        "Palette: {} materials ({} bytes)",
        baked.palette_count(),
        baked.palette_bytes().len()
    );

    if args.check {
        if let Err(e) = baked.flattened().validate() {
            bail!("Flattened octree failed validation: {e}");
        }
        println!("Record links verified");
    }

    if let Some(count) = args.print {
        for (index, record) in baked.records().iter().take(count).enumerate() {
            println!("#{index}: {record}");
        }
    }

    write_buffers(&args.out_dir, &baked)?;

    Ok(())
}

fn write_buffers(out_dir: &Path, baked: &BakedModel) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output dir: {}", out_dir.display()))?;

    for (name, bytes) in [
        ("octree.bin", baked.octree_bytes()),
        ("palette.bin", baked.palette_bytes()),
    ] {
        let path = out_dir.join(name);
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["svo_bake", "model.ply", "-o", "out", "--print", "3", "--check"])
            .unwrap();
        assert_eq!(args.model, PathBuf::from("model.ply"));
        assert_eq!(args.out_dir, PathBuf::from("out"));
        assert_eq!(args.print, Some(3));
        assert!(args.check);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["svo_bake", "model.ply"]).unwrap();
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert_eq!(args.print, None);
        assert!(!args.check);
    }

    #[test]
    fn test_args_require_model() {
        assert!(Args::try_parse_from(["svo_bake"]).is_err());
    }

    #[test]
    fn test_write_buffers() {
        let model = nubila_svo::ModelLoader::default()
            .load_from_str("end_header\n0 0 0 255 0 0\n1 1 1 0 255 0\n", "inline")
            .unwrap();
        let baked = BakedModel::from_model(model, BakeConfig::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("baked");
        write_buffers(&out_dir, &baked).unwrap();

        let octree = fs::read(out_dir.join("octree.bin")).unwrap();
        let palette = fs::read(out_dir.join("palette.bin")).unwrap();
        assert_eq!(octree, baked.octree_bytes());
        assert_eq!(palette, baked.palette_bytes());
        assert_eq!(octree.len(), 9 * 60);
        assert_eq!(palette.len(), 2 * 12);
    }
}
