//! # 声明式日志提取规则
//!
//! 每条规则描述 "锚点关键字 → 行偏移 → 字段下标 → 类型"，日志格式变化时只需修改规则表。
//!
//! ## 功能
//! - 前缀 / 包含两种锚点匹配（匹配前去掉行首尾空白）
//! - 首次或末次出现
//! - 正向下标、倒数下标、下标区间
//! - Hartree → eV 换算在提取时完成
//! - 未找到的字段返回 `None`，不会与真实数值混淆
//!
//! ## 依赖关系
//! - 被 `parsers/crystal_out.rs`, `parsers/status.rs` 使用
//! - 无外部模块依赖

use crate::error::{read_lossy, Result};

use std::collections::BTreeMap;
use std::path::Path;

/// 1 Hartree = 27.2114 eV
pub const HARTREE_TO_EV: f64 = 27.2114;

pub fn hartree_to_ev(hartree: f64) -> f64 {
    hartree * HARTREE_TO_EV
}

pub fn ev_to_hartree(ev: f64) -> f64 {
    ev / HARTREE_TO_EV
}

// ─────────────────────────────────────────────────────────────
// 规则定义
// ─────────────────────────────────────────────────────────────

/// 锚点匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Prefix(&'static str),
    Contains(&'static str),
}

impl Anchor {
    pub fn matches(&self, line: &str) -> bool {
        let line = line.trim();
        match self {
            Anchor::Prefix(p) => line.starts_with(p.trim()),
            Anchor::Contains(s) => line.contains(s.trim()),
        }
    }
}

/// 字段位置（按空白切分）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// 第 n 个字段，从 0 开始
    Index(usize),
    /// 倒数第 n 个字段，1 为最后一个
    FromEnd(usize),
    /// [start, end) 区间，得到数值列表
    Range(usize, usize),
}

/// 字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Float,
    Int,
    Text,
    /// Hartree 数值，提取时换算为 eV
    Hartree,
}

/// 多次出现时取哪一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    First,
    Last,
}

/// 一条提取规则
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub field: &'static str,
    pub anchor: Anchor,
    /// 相对锚点行的行偏移
    pub offset: usize,
    pub token: Token,
    pub kind: Kind,
    pub occurrence: Occurrence,
}

impl Rule {
    /// 默认：锚点行本身、最后一个字段、浮点数、首次出现
    pub const fn new(field: &'static str, anchor: Anchor) -> Self {
        Rule {
            field,
            anchor,
            offset: 0,
            token: Token::FromEnd(1),
            kind: Kind::Float,
            occurrence: Occurrence::First,
        }
    }

    pub const fn offset(self, offset: usize) -> Self {
        Rule { offset, ..self }
    }

    pub const fn token(self, token: Token) -> Self {
        Rule { token, ..self }
    }

    pub const fn kind(self, kind: Kind) -> Self {
        Rule { kind, ..self }
    }

    pub const fn last(self) -> Self {
        Rule {
            occurrence: Occurrence::Last,
            ..self
        }
    }
}

/// 提取到的值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Text(String),
    List(Vec<f64>),
}

/// 提取结果：字段名 → 值或 None
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    values: BTreeMap<&'static str, Option<Value>>,
}

impl Extraction {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field).and_then(|v| v.as_ref())
    }

    pub fn float(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.get(field)? {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 未找到的字段名
    pub fn missing(&self) -> Vec<&'static str> {
        self.values
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────
// 提取
// ─────────────────────────────────────────────────────────────

/// 按规则表提取全部字段
pub fn extract<S: AsRef<str>>(lines: &[S], rules: &[Rule]) -> Extraction {
    let mut values = BTreeMap::new();
    for rule in rules {
        let value = apply(lines, rule);
        if value.is_none() {
            log::debug!("rule '{}' found nothing", rule.field);
        }
        values.insert(rule.field, value);
    }
    Extraction { values }
}

/// 单条规则
pub fn apply<S: AsRef<str>>(lines: &[S], rule: &Rule) -> Option<Value> {
    let hits = find_all(lines, rule.anchor);
    let idx = match rule.occurrence {
        Occurrence::First => *hits.first()?,
        Occurrence::Last => *hits.last()?,
    };
    let line = lines.get(idx + rule.offset)?.as_ref();
    parse_token(line, rule.token, rule.kind)
}

/// 所有匹配锚点的行号
pub fn find_all<S: AsRef<str>>(lines: &[S], anchor: Anchor) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| anchor.matches(l.as_ref()))
        .map(|(i, _)| i)
        .collect()
}

/// 第一个匹配行
pub fn find_first<S: AsRef<str>>(lines: &[S], anchor: Anchor) -> Option<usize> {
    lines.iter().position(|l| anchor.matches(l.as_ref()))
}

/// 最后一个匹配行
pub fn find_last<S: AsRef<str>>(lines: &[S], anchor: Anchor) -> Option<usize> {
    lines.iter().rposition(|l| anchor.matches(l.as_ref()))
}

/// 从一行中取字段并转换
pub fn parse_token(line: &str, token: Token, kind: Kind) -> Option<Value> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match token {
        Token::Index(i) => convert(fields.get(i)?, kind),
        Token::FromEnd(n) => {
            if n == 0 || n > fields.len() {
                return None;
            }
            convert(fields[fields.len() - n], kind)
        }
        Token::Range(start, end) => {
            let slice = fields.get(start..end)?;
            let mut out = Vec::with_capacity(slice.len());
            for f in slice {
                let v = parse_number(f)?;
                out.push(if kind == Kind::Hartree { hartree_to_ev(v) } else { v });
            }
            Some(Value::List(out))
        }
    }
}

fn convert(raw: &str, kind: Kind) -> Option<Value> {
    match kind {
        Kind::Float => parse_number(raw).map(Value::Float),
        Kind::Hartree => parse_number(raw).map(|v| Value::Float(hartree_to_ev(v))),
        Kind::Int => raw
            .trim_end_matches([';', ',', ':'])
            .parse::<i64>()
            .ok()
            .map(Value::Int),
        Kind::Text => Some(Value::Text(raw.to_string())),
    }
}

/// 解析数值，兼容 Fortran `D` 指数和结尾分隔符（"-2.44E-01;"）
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim_end_matches([';', ',', ':', ')']);
    let cleaned = cleaned.replace(['D', 'd'], "E");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ─────────────────────────────────────────────────────────────
// 日志文件
// ─────────────────────────────────────────────────────────────

/// 读入内存的日志，已去除并行进程的 ` PROCESS` 输出行
#[derive(Debug, Clone, Default)]
pub struct LogFile {
    pub lines: Vec<String>,
}

impl LogFile {
    pub fn read(path: &Path) -> Result<Self> {
        Ok(LogFile::parse(&read_lossy(path)?))
    }

    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .filter(|l| !l.starts_with(" PROCESS"))
            .map(|l| l.to_string())
            .collect();
        LogFile { lines }
    }

    /// 截断到第一个匹配锚点之前（不含）
    pub fn until(&self, anchor: Anchor) -> &[String] {
        match find_first(&self.lines, anchor) {
            Some(i) => &self.lines[..i],
            None => &self.lines,
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = r#"
 CYC   1 ETOT(AU) -2.7500000000000E+02 DETOT -2.75E+02 tst  0.00E+00 PX  1.00E+00
 CYC   2 ETOT(AU) -2.7557464466174E+02 DETOT -5.74E-01 tst  1.77E-01 PX  1.00E+00
 PROCESS    3 OF   8 WORKING
 LATTICE PARAMETERS  (ANGSTROMS AND DEGREES) - PRIMITIVE CELL
       A              B              C           ALPHA      BETA       GAMMA        VOLUME
     2.97834500     2.97834500     2.97834500    60.000000  60.000000  60.000000     18.680817
 INDIRECT ENERGY BAND GAP:   7.1234 eV
"#;

    #[test]
    fn test_read_log_with_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NiO.out");
        let mut bytes = b"\xc3\x28 header\n".to_vec();
        bytes.extend_from_slice(LOG.as_bytes());
        std::fs::write(&path, bytes).unwrap();

        let log = LogFile::read(&path).unwrap();
        assert!(!log.contains("PROCESS"));
        assert!(log.contains("INDIRECT ENERGY BAND GAP"));
    }

    #[test]
    fn test_hartree_round_trip() {
        for x in [-275.57464466174, -0.244, 0.0, 1.0e-6, 12345.678] {
            let back = ev_to_hartree(hartree_to_ev(x));
            assert!((back - x).abs() <= 1e-9 * x.abs().max(1.0));
        }
        assert!((hartree_to_ev(1.0) - 27.2114).abs() < 1e-12);
    }

    #[test]
    fn test_extract_table() {
        let log = LogFile::parse(LOG);
        assert!(!log.lines.iter().any(|l| l.contains("PROCESS")));

        let rules = [
            Rule::new("energy", Anchor::Contains("ETOT(AU)"))
                .token(Token::Index(3))
                .kind(Kind::Hartree)
                .last(),
            Rule::new("energy_first", Anchor::Contains("ETOT(AU)"))
                .token(Token::Index(3))
                .kind(Kind::Float),
            Rule::new("cell", Anchor::Prefix("LATTICE PARAMETERS"))
                .offset(2)
                .token(Token::Range(0, 7)),
            Rule::new("gap", Anchor::Prefix(" INDIRECT ENERGY BAND GAP:")).token(Token::FromEnd(2)),
            Rule::new("fermi", Anchor::Contains("FERMI ENERGY")),
        ];
        let ex = extract(&log.lines, &rules);

        let e = ex.float("energy").unwrap();
        assert!((e - (-275.57464466174 * HARTREE_TO_EV)).abs() < 1e-6);
        assert!((ex.float("energy_first").unwrap() + 275.0).abs() < 1e-9);
        assert!(matches!(ex.get("cell"), Some(Value::List(v)) if v.len() == 7));
        assert!((ex.float("gap").unwrap() - 7.1234).abs() < 1e-12);
        assert_eq!(ex.float("fermi"), None);
        assert_eq!(ex.missing(), vec!["fermi"]);
    }

    #[test]
    fn test_prefix_does_not_match_inside_longer_word() {
        let lines = [" INDIRECT ENERGY BAND GAP:   1.0 eV"];
        assert!(!Anchor::Prefix(" DIRECT ENERGY BAND GAP:").matches(lines[0]));
        assert!(Anchor::Contains("DIRECT ENERGY").matches(lines[0]));
    }

    #[test]
    fn test_offset_past_end_is_absent() {
        let lines = ["HEADER"];
        let rule = Rule::new("x", Anchor::Prefix("HEADER")).offset(3);
        assert_eq!(apply(&lines, &rule), None);
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("-2.5E-01;"), Some(-0.25));
        assert_eq!(parse_number("1.5D+00"), Some(1.5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
    }
}
