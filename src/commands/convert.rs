//! # convert 命令实现
//!
//! ## 功能
//! - `cif2d12`: CIF → `.d12` 输入文件
//! - `out2cif`: 日志最后的原胞 → P1 CIF（平板 c 取 40 Å）
//! - `optimized`: 日志最终优化几何 → `{name}_optimized.d12`
//!
//! 每个文件/材料独立处理，失败只记入汇总。
//!
//! ## 依赖关系
//! - 使用 `cli/convert.rs` 定义的参数
//! - 使用 `parsers/cif.rs`, `parsers/d12.rs`, `parsers/crystal_out.rs`
//! - 使用 `batch/`

use crate::batch::{BatchRunner, FileCollector, MaterialCollector, ProcessResult};
use crate::cli::convert::{Cif2d12Args, ConvertArgs, ConvertCommands, LogBatchArgs};
use crate::error::{create_dir, read_to_string, write_string, CryskitError, Result};
use crate::models::options::{Basis, DeckOptions};
use crate::models::{FileRole, MaterialFiles};
use crate::parsers::{cif, crystal_out, d12, LogFile};
use crate::utils::output;

use std::path::{Path, PathBuf};

/// 平板 CIF 使用的 c 轴长度 (Å)
const SLAB_CELL_HEIGHT: f64 = 40.0;

/// 执行 convert 命令
pub fn execute(args: ConvertArgs) -> Result<()> {
    match args.command {
        ConvertCommands::Cif2d12(args) => cif_to_d12(&args),
        ConvertCommands::Out2cif(args) => out_to_cif(&args),
        ConvertCommands::Optimized(args) => optimized_decks(&args),
    }
}

// ─────────────────────────────────────────────────────────────
// cif2d12
// ─────────────────────────────────────────────────────────────

/// 合并 `--options` 文件与命令行覆盖项
pub fn deck_options(args: &Cif2d12Args) -> Result<DeckOptions> {
    let mut options = match &args.options {
        Some(path) => DeckOptions::load(path)?,
        None => DeckOptions::default(),
    };

    if let Some(dim) = args.dimensionality {
        options.dimensionality = dim.into();
    }
    if let Some(calc) = args.calculation {
        options.calculation = calc.into();
    }
    if let Some(opt) = args.optimization {
        options.optimization = Some(opt.into());
    }
    if let Some(functional) = &args.functional {
        options.functional = functional.to_uppercase();
    }
    if args.dispersion {
        options.dispersion = true;
    }
    if args.spin {
        options.spin_polarized = true;
    }
    if let Some(dir) = &args.basis_dir {
        if !dir.is_dir() {
            return Err(CryskitError::DirectoryNotFound {
                path: dir.display().to_string(),
            });
        }
        options.basis = Basis::External { dir: dir.clone() };
    }
    if let Some(name) = &args.basis_set {
        options.basis = Basis::Internal { name: name.clone() };
    }
    if let Some(grid) = &args.grid {
        options.grid = grid.to_uppercase();
    }
    if let Some(scf) = args.scf {
        options.scf_method = scf.into();
    }
    if args.smear.is_some() {
        options.smearing = args.smear;
    }
    Ok(options)
}

fn cif_to_d12(args: &Cif2d12Args) -> Result<()> {
    output::print_header("Generating .d12 decks from CIF");

    let options = deck_options(args)?;
    if let Some(path) = &args.save_options {
        options.save(path)?;
        output::print_info(&format!("Deck options saved to '{}'", path.display()));
    }

    let files = FileCollector::new(&args.dir, &args.pattern)?
        .recursive(args.recursive)
        .collect()?;
    if files.is_empty() {
        output::print_warning(&format!(
            "No files matched '{}' under {}",
            args.pattern,
            args.dir.display()
        ));
        return Ok(());
    }
    output::print_info(&format!("Found {} CIF files", files.len()));
    log::debug!("deck options: {:?}", options);

    if let Some(out) = &args.output {
        create_dir(out)?;
    }

    let runner = BatchRunner::new(args.jobs).with_message("Writing decks");
    let result = runner.run(&files, |path| {
        convert_cif(path, &options, args.output.as_deref(), args.overwrite)
    });
    result.report("CIF files");
    Ok(())
}

fn convert_cif(path: &Path, options: &DeckOptions, out_dir: Option<&Path>, overwrite: bool) -> ProcessResult {
    let item = path.display().to_string();
    let stem = match path.file_stem().and_then(|s| s.to_str()) {
        Some(s) => s,
        None => return ProcessResult::failed(&item, "invalid file name"),
    };
    let dir = out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.parent().unwrap_or(Path::new(".")).to_path_buf());
    let target = dir.join(options.output_name(stem));

    if target.exists() && !overwrite {
        return ProcessResult::Skipped(format!("Output exists, skipping: {}", target.display()));
    }

    let deck = cif::parse_cif_file(path).and_then(|structure| {
        log::debug!("{}: {} ({} atoms)", item, structure.formula(), structure.atoms.len());
        d12::write_deck(&structure, options)
    });
    match deck.and_then(|text| write_string(&target, &text)) {
        Ok(()) => ProcessResult::Success(format!("{} -> {}", item, target.display())),
        Err(e) => ProcessResult::failed(&item, e),
    }
}

// ─────────────────────────────────────────────────────────────
// out2cif
// ─────────────────────────────────────────────────────────────

/// 由日志生成 P1 CIF 文本
pub fn log_to_cif(name: &str, log: &LogFile) -> Result<String> {
    let bad = |reason: &str| CryskitError::ParseError {
        format: "CRYSTAL output".to_string(),
        path: name.to_string(),
        reason: reason.to_string(),
    };
    let mut cell = crystal_out::primitive_cell(&log.lines).ok_or_else(|| bad("no primitive cell table"))?;
    let atoms = crystal_out::asymmetric_atoms(log);
    if atoms.is_empty() {
        return Err(bad("no atom table"));
    }

    // 平板日志中 z 为 Å
    let slab = crystal_out::is_slab(log);
    if slab {
        cell.c = SLAB_CELL_HEIGHT;
    }
    let sites: Vec<(String, [f64; 3])> = atoms
        .iter()
        .map(|a| {
            let mut p = a.position;
            if slab {
                p[2] /= SLAB_CELL_HEIGHT;
            }
            (a.symbol.clone(), p)
        })
        .collect();

    Ok(cif::to_p1_cif(name, &cell, &sites))
}

fn log_materials(args: &LogBatchArgs) -> Result<Vec<MaterialFiles>> {
    let materials = MaterialCollector::new(&args.dir, FileRole::Log)
        .recursive(args.recursive)
        .collect()?;
    if materials.is_empty() {
        output::print_warning(&format!("No .out logs found under {}", args.dir.display()));
    } else {
        output::print_info(&format!("Found {} logs", materials.len()));
    }
    Ok(materials)
}

fn out_to_cif(args: &LogBatchArgs) -> Result<()> {
    output::print_header("Writing CIF files from CRYSTAL logs");
    let materials = log_materials(args)?;
    if materials.is_empty() {
        return Ok(());
    }

    let runner = BatchRunner::new(args.jobs).with_message("Writing CIF");
    let result = runner.run(&materials, |m| {
        let target = m.sibling(".cif");
        if target.exists() && !args.overwrite {
            return ProcessResult::Skipped(format!("Output exists, skipping: {}", target.display()));
        }
        let written = m
            .path(FileRole::Log)
            .and_then(LogFile::read)
            .and_then(|log| log_to_cif(&m.name, &log))
            .and_then(|text| write_string(&target, &text));
        match written {
            Ok(()) => ProcessResult::Success(target.display().to_string()),
            Err(e) => ProcessResult::failed(&m.name, e),
        }
    });
    result.report("logs");
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// optimized
// ─────────────────────────────────────────────────────────────

fn optimized_decks(args: &LogBatchArgs) -> Result<()> {
    output::print_header("Writing optimized .d12 decks");
    let materials = log_materials(args)?;
    if materials.is_empty() {
        return Ok(());
    }

    let runner = BatchRunner::new(args.jobs).with_message("Rewriting decks");
    let result = runner.run(&materials, |m| optimized_deck(m, args.overwrite));
    result.report("logs");
    Ok(())
}

fn optimized_deck(m: &MaterialFiles, overwrite: bool) -> ProcessResult {
    let target: PathBuf = m.sibling("_optimized.d12");
    if target.exists() && !overwrite {
        return ProcessResult::Skipped(format!("Output exists, skipping: {}", target.display()));
    }

    let run = || -> Result<Option<String>> {
        m.require(&[FileRole::Log, FileRole::Deck])?;
        let log = LogFile::read(m.path(FileRole::Log)?)?;
        let geometry = match crystal_out::final_optimized_geometry(&log) {
            Some(g) => g,
            None => return Ok(None),
        };
        if let Some(n) = crystal_out::irreducible_atom_count(&log) {
            if n != geometry.atoms.len() {
                log::warn!("{}: {} irreducible atoms reported, {} in final geometry", m.name, n, geometry.atoms.len());
            }
        }
        let deck_path = m.path(FileRole::Deck)?;
        let deck = read_to_string(deck_path)?;
        let text = d12::rewrite_optimized(&deck, &geometry).map_err(|e| match e {
            CryskitError::ParseError { format, reason, .. } => CryskitError::ParseError {
                format,
                path: deck_path.display().to_string(),
                reason,
            },
            other => other,
        })?;
        write_string(&target, &text)?;
        Ok(Some(target.display().to_string()))
    };

    match run() {
        Ok(Some(path)) => ProcessResult::Success(path),
        Ok(None) => ProcessResult::Skipped(format!("{}: no final optimized geometry", m.name)),
        Err(e) => ProcessResult::failed(&m.name, e),
    }
}
