//! # deck 命令实现
//!
//! ## 功能
//! - `band`: 由 SCF 日志与 `.d12` 生成 `{name}_BAND.d3`
//! - `transport`: 由 SCF 日志带边生成 `{name}_TRANSPORT.d3`
//! - `fix-shrink`: 原地修正 `.d12` 中的各向异性 SHRINK
//!
//! 两个 `.d3` 命令都会把 `{name}.f9` 复制为对应的波函数文件。
//!
//! ## 依赖关系
//! - 使用 `cli/deck.rs` 定义的参数
//! - 使用 `parsers/d3.rs`, `parsers/d12.rs`, `parsers/crystal_out.rs`

use crate::batch::{BatchRunner, FileCollector, MaterialCollector, ProcessResult};
use crate::cli::convert::LogBatchArgs;
use crate::cli::deck::{BandArgs, DeckArgs, DeckCommands, FixShrinkArgs};
use crate::error::{read_to_string, write_error, write_string, CryskitError, Result};
use crate::models::{CrystalSystem, FileRole, MaterialFiles};
use crate::parsers::d12::DeckHeader;
use crate::parsers::{crystal_out, d12, d3, LogFile};
use crate::utils::output;

use std::path::Path;

/// 执行 deck 命令
pub fn execute(args: DeckArgs) -> Result<()> {
    match args.command {
        DeckCommands::Band(args) => band_decks(&args),
        DeckCommands::Transport(args) => transport_decks(&args),
        DeckCommands::FixShrink(args) => fix_shrink(&args),
    }
}

fn materials(args: &LogBatchArgs) -> Result<Vec<MaterialFiles>> {
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

/// 复制 `{name}.f9` 为 `{name}{suffix}`，没有波函数时返回 false
fn copy_wavefunction(m: &MaterialFiles, suffix: &str) -> Result<bool> {
    let source = match m.get(FileRole::Wavefunction) {
        Some(p) => p,
        None => return Ok(false),
    };
    let target = m.sibling(suffix);
    std::fs::copy(source, &target).map_err(|e| write_error(&target, e))?;
    Ok(true)
}

/// 写出 `.d3` 并附带波函数，返回结果描述
fn write_d3(m: &MaterialFiles, kind: &str, text: &str) -> Result<String> {
    let target = m.sibling(&format!("_{}.d3", kind));
    write_string(&target, text)?;
    if !copy_wavefunction(m, &format!("_{}.f9", kind))? {
        log::warn!("{}: no .f9 wavefunction to copy", m.name);
    }
    Ok(target.display().to_string())
}

fn outcome(name: &str, result: Result<String>) -> ProcessResult {
    match result {
        Ok(path) => ProcessResult::Success(path),
        Err(e) => ProcessResult::failed(name, e),
    }
}

// ─────────────────────────────────────────────────────────────
// band
// ─────────────────────────────────────────────────────────────

/// 由日志与输入文件生成能带 `.d3` 文本
pub fn band_input(name: &str, log: &LogFile, deck: &str, template_dir: Option<&Path>) -> Result<String> {
    let missing = |what: &str| CryskitError::ParseError {
        format: "CRYSTAL output".to_string(),
        path: name.to_string(),
        reason: format!("no {} found", what),
    };

    let centering = crystal_out::centering(log).ok_or_else(|| missing("space group symbol"))?;
    let orbitals = crystal_out::orbital_count(log).ok_or_else(|| missing("NUMBER OF AO"))?;
    let space_group = DeckHeader::parse(deck)
        .space_group
        .ok_or_else(|| CryskitError::ParseError {
            format: "d12".to_string(),
            path: name.to_string(),
            reason: "no space group number".to_string(),
        })?;
    let system = CrystalSystem::from_space_group(space_group)
        .ok_or(CryskitError::InvalidSpaceGroup(space_group))?;

    let template = d3::band_template(system, centering, template_dir)?;
    log::debug!("{}: {} {} path with {} segments", name, system, centering, template.segments.len());
    Ok(d3::band_deck(name, &template, orbitals))
}

fn band_decks(args: &BandArgs) -> Result<()> {
    output::print_header("Generating band structure .d3 decks");
    let materials = materials(&args.batch)?;
    if materials.is_empty() {
        return Ok(());
    }
    let template_dir = args.template_dir.as_deref();

    let runner = BatchRunner::new(args.batch.jobs).with_message("Writing BAND decks");
    let result = runner.run(&materials, |m| {
        if m.sibling("_BAND.d3").exists() && !args.batch.overwrite {
            return ProcessResult::Skipped(format!("{}_BAND.d3 exists", m.name));
        }
        let run = || -> Result<String> {
            m.require(&[FileRole::Log, FileRole::Deck])?;
            let log = LogFile::read(m.path(FileRole::Log)?)?;
            let deck = read_to_string(m.path(FileRole::Deck)?)?;
            let text = band_input(&m.name, &log, &deck, template_dir)?;
            write_d3(m, "BAND", &text)
        };
        outcome(&m.name, run())
    });
    result.report("materials");
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// transport
// ─────────────────────────────────────────────────────────────

/// 由日志带边与输入文件 SHRINK 生成输运 `.d3` 文本
pub fn transport_input(name: &str, log: &LogFile, deck: &str) -> Result<String> {
    let edges = crystal_out::transport_edges(log).ok_or_else(|| CryskitError::ParseError {
        format: "CRYSTAL output".to_string(),
        path: name.to_string(),
        reason: "no band edges before SCF ENDED".to_string(),
    })?;
    let header = DeckHeader::parse(deck);
    if header.shrink.is_empty() {
        log::info!("{}: no SHRINK in deck, using default NEWK grid", name);
    }
    Ok(d3::transport_deck(&header.shrink, &edges))
}

fn transport_decks(args: &LogBatchArgs) -> Result<()> {
    output::print_header("Generating transport .d3 decks");
    let materials = materials(args)?;
    if materials.is_empty() {
        return Ok(());
    }

    let runner = BatchRunner::new(args.jobs).with_message("Writing TRANSPORT decks");
    let result = runner.run(&materials, |m| {
        if m.sibling("_TRANSPORT.d3").exists() && !args.overwrite {
            return ProcessResult::Skipped(format!("{}_TRANSPORT.d3 exists", m.name));
        }
        let run = || -> Result<String> {
            m.require(&[FileRole::Log, FileRole::Deck])?;
            let log = LogFile::read(m.path(FileRole::Log)?)?;
            let deck = read_to_string(m.path(FileRole::Deck)?)?;
            let text = transport_input(&m.name, &log, &deck)?;
            write_d3(m, "TRANSPORT", &text)
        };
        outcome(&m.name, run())
    });
    result.report("materials");
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// fix-shrink
// ─────────────────────────────────────────────────────────────

fn fix_shrink(args: &FixShrinkArgs) -> Result<()> {
    output::print_header("Fixing anisotropic SHRINK factors");
    let files = FileCollector::new(&args.dir, "*.d12")?.recursive(true).collect()?;

    let mut fixed = 0;
    for path in &files {
        let text = read_to_string(path)?;
        let new_text = match d12::fix_shrink(&text) {
            Some(t) => t,
            None => continue,
        };
        if !args.dry_run {
            write_string(path, &new_text)?;
        }
        output::print_success(&path.display().to_string());
        fixed += 1;
    }

    let verb = if args.dry_run { "would be fixed" } else { "fixed" };
    output::print_done(&format!("{} of {} decks {}", fixed, files.len(), verb));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCF_LOG: &str = r#"
 SPACE GROUP (CENTROSYMMETRIC) : F M 3 M
 NUMBER OF AO   36
 TOP OF VALENCE BANDS -    BAND     10; K    1; EIG -2.0000000E-01 AU
 BOTTOM OF VIRTUAL BANDS -    BAND     11; K    1; EIG  1.0000000E-01 AU
 DIRECT ENERGY BAND GAP:   8.1634 eV
 == SCF ENDED - CONVERGENCE ON ENERGY      E(AU) -2.7557464466174E+02 CYCLES  12
"#;

    const DECK: &str = "MgO\nCRYSTAL\n0 0 0\n225\n4.21\n2\n12 0.0 0.0 0.0\n8 0.5 0.5 0.5\nEND\nSHRINK\n0 20\n10 10 10\nEND\n";

    #[test]
    fn test_band_input() {
        let log = LogFile::parse(SCF_LOG);
        let text = band_input("MgO", &log, DECK, None).unwrap();
        assert!(text.starts_with("NEWK\n48 48\n1 0\nBAND\nMgO\n9 0 1000 1 36 1 0\nG X\n"));

        let err = band_input("MgO", &log, "MgO\nSLAB\n", None).unwrap_err();
        assert!(matches!(err, CryskitError::ParseError { .. }));
    }

    #[test]
    fn test_transport_input() {
        let log = LogFile::parse(SCF_LOG);
        let text = transport_input("MgO", &log, DECK).unwrap();
        assert!(text.starts_with("NEWK\n0 20\n10 10 10\n1 0\nBOLTZTRA\n"));
        // VBM = -5.44 eV、CBM = 2.72 eV
        assert!(text.contains("TDFRANGE\n-6.4 3.7 0.001\n"));
        assert!(transport_input("x", &LogFile::parse("nothing\n"), DECK).is_err());
    }

    #[test]
    fn test_band_batch_copies_wavefunction() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("MgO.out"), SCF_LOG).unwrap();
        std::fs::write(dir.path().join("MgO.d12"), DECK).unwrap();
        std::fs::write(dir.path().join("MgO.f9"), "wf").unwrap();
        // 缺少 .d12 的材料单独失败
        std::fs::write(dir.path().join("CaO.out"), SCF_LOG).unwrap();

        let args = BandArgs {
            batch: LogBatchArgs {
                dir: dir.path().to_path_buf(),
                jobs: 1,
                recursive: false,
                overwrite: false,
            },
            template_dir: None,
        };
        band_decks(&args).unwrap();

        assert!(dir.path().join("MgO_BAND.d3").exists());
        assert_eq!(std::fs::read_to_string(dir.path().join("MgO_BAND.f9")).unwrap(), "wf");
        assert!(dir.path().join("MgO.f9").exists());
        assert!(!dir.path().join("CaO_BAND.d3").exists());
    }

    #[test]
    fn test_fix_shrink_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("a");
        std::fs::create_dir(&sub).unwrap();
        let path = sub.join("MgO.d12");
        std::fs::write(&path, DECK).unwrap();

        fix_shrink(&FixShrinkArgs {
            dir: dir.path().to_path_buf(),
            dry_run: true,
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DECK);

        let mut anisotropic = DECK.replace("10 10 10", "10 12 8");
        std::fs::write(&path, &anisotropic).unwrap();
        fix_shrink(&FixShrinkArgs {
            dir: dir.path().to_path_buf(),
            dry_run: false,
        })
        .unwrap();
        anisotropic = std::fs::read_to_string(&path).unwrap();
        assert!(anisotropic.contains("SHRINK\n0 20\n8 8 8\n"));
    }
}
