//! rsfec - split files into Reed-Solomon shard sets and rebuild them

use anyhow::{Context, Result};
use log::{debug, info, LevelFilter};
use rsfec::args::parse_args;
use rsfec::reed_solomon::{
    detect_capabilities, CapabilitySet, Construction, Encoder, EncoderBuilder,
};
use rsfec::shard_file::{load_shard_set, shard_path, SetInfo, ShardFile, ShardSet};
use rsfec::stripe::{self, DEFAULT_STRIPE_SIZE};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let matches = parse_args();
    let Some((command, sub_matches)) = matches.subcommand() else {
        eprintln!("Error: No command specified");
        eprintln!("\nUse 'rsfec --help' for usage information");
        std::process::exit(1);
    };

    let mut logger = env_logger::Builder::from_default_env();
    if sub_matches.get_flag("verbose") {
        logger.filter_level(LevelFilter::Debug);
    }
    logger
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    match command {
        "encode" => handle_encode(sub_matches),
        "reconstruct" => handle_reconstruct(sub_matches),
        "verify" => handle_verify(sub_matches),
        other => {
            eprintln!("Unknown command: {}", other);
            std::process::exit(1);
        }
    }
}

fn capabilities(matches: &clap::ArgMatches) -> CapabilitySet {
    if matches.get_flag("scalar") {
        CapabilitySet::scalar_only()
    } else {
        detect_capabilities()
    }
}

fn build_encoder(info: &SetInfo, caps: CapabilitySet) -> Result<Encoder> {
    let encoder = EncoderBuilder::new(info.data_shards, info.parity_shards)
        .construction(info.construction)
        .capabilities(caps)
        .build()
        .context("Failed to create encoder")?;
    debug!("Kernel: {:?}", encoder.simd_level());
    Ok(encoder)
}

fn required_path(matches: &clap::ArgMatches, name: &str) -> Result<PathBuf> {
    matches
        .get_one::<String>(name)
        .map(PathBuf::from)
        .with_context(|| format!("Missing argument: {}", name))
}

fn handle_encode(matches: &clap::ArgMatches) -> Result<()> {
    let input = required_path(matches, "input")?;
    let data_shards = *matches.get_one::<usize>("data").context("Missing --data")?;
    let parity_shards = *matches
        .get_one::<usize>("parity")
        .context("Missing --parity")?;
    let construction = if matches.get_flag("cauchy") {
        Construction::Cauchy
    } else {
        Construction::Vandermonde
    };
    let stripe_size = matches
        .get_one::<usize>("stripe_size")
        .copied()
        .unwrap_or(DEFAULT_STRIPE_SIZE);
    anyhow::ensure!(stripe_size > 0, "Stripe size must be positive");

    let data = std::fs::read(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let info = SetInfo {
        data_shards,
        parity_shards,
        construction,
        original_len: data.len() as u64,
        shard_len: stripe::shard_len_for(data.len(), data_shards) as u64,
        stripe_size: stripe_size as u64,
    };
    let encoder = build_encoder(&info, capabilities(matches))?;

    let mut shards = stripe::split(&data, data_shards, parity_shards);
    stripe::encode_stripes(&encoder, &mut shards, stripe_size).context("Encoding failed")?;

    let base = shard_base(&input, matches.get_one::<String>("out_dir").map(Path::new))?;
    for (index, payload) in shards.into_iter().enumerate() {
        let path = shard_path(&base, index);
        ShardFile::new(&info, index, payload)
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    println!(
        "Encoded {} ({} bytes) into {} data + {} parity shards of {} bytes",
        input.display(),
        info.original_len,
        data_shards,
        parity_shards,
        info.shard_len
    );
    Ok(())
}

/// Base path for shard file names: the input path, relocated into `out_dir`
fn shard_base(input: &Path, out_dir: Option<&Path>) -> Result<PathBuf> {
    match out_dir {
        None => Ok(input.to_path_buf()),
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let name = input
                .file_name()
                .with_context(|| format!("Input has no file name: {}", input.display()))?;
            Ok(dir.join(name))
        }
    }
}

fn load(base: &Path) -> Result<ShardSet> {
    let set = load_shard_set(base)
        .with_context(|| format!("Failed to load shards for {}", base.display()))?;
    for index in &set.damaged {
        info!("Shard {} is damaged and will be treated as missing", index);
    }
    Ok(set)
}

fn handle_reconstruct(matches: &clap::ArgMatches) -> Result<()> {
    let base = required_path(matches, "input")?;
    let out = matches
        .get_one::<String>("out")
        .map(PathBuf::from)
        .unwrap_or_else(|| base.clone());

    let mut set = load(&base)?;
    let missing = set.missing();
    let encoder = build_encoder(&set.info, capabilities(matches))?;

    stripe::reconstruct_stripes(&encoder, &mut set.shards, set.info.stripe_size as usize)
        .with_context(|| {
            format!(
                "Cannot rebuild {}: shards {:?} missing",
                base.display(),
                missing
            )
        })?;

    let shards: Vec<Vec<u8>> = set.shards.into_iter().flatten().collect();
    let data = stripe::join(&shards, set.info.data_shards, set.info.original_len as usize);
    std::fs::write(&out, &data).with_context(|| format!("Failed to write {}", out.display()))?;

    if missing.is_empty() {
        println!("All shards present; wrote {}", out.display());
    } else {
        println!(
            "Recovered {} missing shard(s) {:?}; wrote {}",
            missing.len(),
            missing,
            out.display()
        );
    }
    Ok(())
}

fn handle_verify(matches: &clap::ArgMatches) -> Result<()> {
    let base = required_path(matches, "input")?;
    let set = load(&base)?;

    if !set.is_complete() {
        let missing = set.missing();
        println!("Shards missing or damaged: {:?}", missing);
        if missing.len() <= set.info.parity_shards {
            println!("Repair is possible.");
            std::process::exit(1);
        }
        println!("Repair is not possible.");
        std::process::exit(2);
    }

    let encoder = build_encoder(&set.info, capabilities(matches))?;
    let shards: Vec<Vec<u8>> = set.shards.into_iter().flatten().collect();
    let consistent = stripe::verify_stripes(&encoder, &shards, set.info.stripe_size as usize)
        .context("Verification failed")?;

    if consistent {
        println!("All {} shards present and consistent.", shards.len());
        Ok(())
    } else {
        anyhow::bail!("Parity does not match data");
    }
}
