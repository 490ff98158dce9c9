// SPDX-FileCopyrightText: Copyright (c) 2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//! Parser for Liberty (.lib) gate-library files.
//!
//! This parser extracts the structural subset of Liberty needed to build a
//! gate-library catalog: cells, their pins and directions, output boolean
//! functions, and flip-flop/latch groups. Timing arcs, power tables and
//! every other attribute are skipped by brace-depth accounting.
//!
//! Parsing runs in two stages: a line-oriented tree builder assembles
//! whitelisted group/attribute statements into an arena-backed syntax
//! tree, then a lifter walks that tree at fixed depths into a
//! [`LibertyLibrary`]. The catalog form consumed by netlist tools is
//! produced from it by [`crate::gate_library::GateLibrary`].

use compact_str::CompactString;
use std::io::BufRead;

/// Errors surfaced by Liberty parsing.
///
/// The grammar itself is lenient: statements that match no whitelisted
/// pattern are dropped, never rejected. Only a missing or wrong root
/// group (and source I/O) fail the parse.
#[derive(Debug)]
pub enum LibertyError {
    /// Reading the source failed.
    Io(String),
    /// The source contains no recognizable statement at all.
    EmptyInput,
    /// The outermost group is not `library`; carries the name found.
    MalformedRoot(String),
}

impl std::fmt::Display for LibertyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibertyError::Io(msg) => write!(f, "liberty I/O error: {}", msg),
            LibertyError::EmptyInput => write!(f, "liberty source contains no statements"),
            LibertyError::MalformedRoot(name) => write!(
                f,
                "liberty source does not start with a 'library' group (found '{}')",
                name
            ),
        }
    }
}

impl std::error::Error for LibertyError {}

/// A pin declared in a `pin` group.
#[derive(Debug, Clone, Default)]
pub struct LibertyPin {
    pub name: CompactString,
    /// `input`, `output` or `inout`, verbatim from the source.
    pub direction: Option<String>,
    /// Boolean function of an output pin, quotes stripped.
    pub function: Option<String>,
    /// Tri-state condition, quotes stripped.
    pub three_state: Option<String>,
    /// Unknown-state function, quotes stripped.
    pub x_function: Option<String>,
}

/// A cell (gate type) with its pins and optional sequential semantics.
///
/// The `ff` attributes (`clocked_on`, `next_state`, `clear`, `preset`,
/// `clear_preset_var*`) are stored with their quotes stripped. The
/// `latch` attributes (`enable`, `data_in` and the shared clear/preset
/// fields) are stored verbatim, quotes included.
#[derive(Debug, Clone, Default)]
pub struct LibertyCell {
    pub name: CompactString,
    /// Pins in declaration order.
    pub pins: Vec<LibertyPin>,
    /// Cell carries an `ff` group.
    pub is_ff: bool,
    /// Cell carries a `latch` group.
    pub is_latch: bool,
    pub clocked_on: Option<String>,
    pub next_state: Option<String>,
    pub clear: Option<String>,
    pub preset: Option<String>,
    pub clear_preset_var1: Option<String>,
    pub clear_preset_var2: Option<String>,
    pub enable: Option<String>,
    pub data_in: Option<String>,
}

/// The parsed library: cells in declaration order.
///
/// Flip-flop and latch semantics live only at this level; the lowered
/// [`crate::gate_library::GateLibrary`] keeps the direction catalog.
#[derive(Debug, Clone, Default)]
pub struct LibertyLibrary {
    pub name: String,
    pub cells: Vec<LibertyCell>,
}

impl LibertyLibrary {
    /// Parse Liberty text.
    pub fn parse_str(input: &str) -> Result<Self, LibertyError> {
        Self::parse_reader(input.as_bytes())
    }

    /// Parse a Liberty source stream line by line.
    pub fn parse_reader(reader: impl BufRead) -> Result<Self, LibertyError> {
        let mut builder = TreeBuilder::default();
        let mut in_block_comment = false;

        for line in reader.lines() {
            let line = line.map_err(|e| LibertyError::Io(e.to_string()))?;
            let (clean, still_in_comment) = scrub_comments(&line, in_block_comment);
            in_block_comment = still_in_comment;

            let clean = clean.trim();
            if clean.is_empty() {
                continue;
            }
            builder.consume_line(clean);
        }

        lift(&builder)
    }
}

/// Remove `//` and `/* … */` comments from one line.
///
/// `in_block_comment` carries the open-block state across lines; the
/// returned flag is the state after this line. Quoted Liberty strings are
/// not recognized here, so comment markers inside them are treated as
/// comments all the same.
fn scrub_comments(line: &str, in_block_comment: bool) -> (String, bool) {
    let mut line = line.to_owned();
    let mut in_block = in_block_comment;

    loop {
        if line.is_empty() {
            break;
        }

        if in_block {
            match line.find("*/") {
                Some(end) => {
                    in_block = false;
                    line.replace_range(..end + 2, "");
                }
                None => {
                    // line lies entirely within the comment
                    line.clear();
                    break;
                }
            }
            continue;
        }

        let line_comment = line.find("//");
        let block_comment = line.find("/*");
        match (line_comment, block_comment) {
            (Some(lc), bc) if bc.map_or(true, |bc| bc > lc) => {
                line.truncate(lc);
            }
            (_, Some(bc)) => match line[bc + 2..].find("*/") {
                Some(rel) => {
                    // block comment opens and closes on this line
                    line.replace_range(bc..bc + 2 + rel + 2, "");
                }
                None => {
                    line.truncate(bc);
                    in_block = true;
                    break;
                }
            },
            _ => break,
        }
    }

    (line, in_block)
}

/// Group names that are kept in the syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Library,
    Cell,
    Pin,
    Ff,
    Latch,
}

impl GroupKind {
    fn from_name(name: &str) -> Option<GroupKind> {
        Some(match name {
            "library" => GroupKind::Library,
            "cell" => GroupKind::Cell,
            "pin" => GroupKind::Pin,
            "ff" => GroupKind::Ff,
            "latch" => GroupKind::Latch,
            _ => return None,
        })
    }
}

/// Attribute names that are kept in the syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrKind {
    Direction,
    Function,
    ThreeState,
    XFunction,
    ClockedOn,
    NextState,
    Clear,
    Preset,
    ClearPresetVar1,
    ClearPresetVar2,
    Enable,
    DataIn,
}

impl AttrKind {
    fn from_name(name: &str) -> Option<AttrKind> {
        Some(match name {
            "direction" => AttrKind::Direction,
            "function" => AttrKind::Function,
            "three_state" => AttrKind::ThreeState,
            "x_function" => AttrKind::XFunction,
            "clocked_on" => AttrKind::ClockedOn,
            "next_state" => AttrKind::NextState,
            "clear" => AttrKind::Clear,
            "preset" => AttrKind::Preset,
            "clear_preset_var1" => AttrKind::ClearPresetVar1,
            "clear_preset_var2" => AttrKind::ClearPresetVar2,
            "enable" => AttrKind::Enable,
            "data_in" => AttrKind::DataIn,
            _ => return None,
        })
    }
}

/// One syntax-tree node: a group statement (`name ( value ) { … }`) or an
/// attribute statement (`name : value ;`). Attribute nodes have no
/// children. All nodes live in the builder's arena; `parent` and
/// `children` are indices into it.
struct Statement {
    is_group: bool,
    name: CompactString,
    /// For groups the parenthesized name, for attributes the right-hand
    /// side including any surrounding quotes.
    value: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// The next structural marker inside a line.
#[derive(Debug, Clone, Copy)]
enum LineToken {
    GroupOpen,
    AttrEnd,
    GroupClose,
}

/// Builds the statement tree from scrubbed, trimmed, non-empty lines.
#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<Statement>,
    root: Option<usize>,
    current_group: Option<usize>,
    /// Brace depth of skipped (non-whitelisted) content.
    ignore_depth: u32,
}

impl TreeBuilder {
    /// Consume one line as a sequence of statement segments.
    ///
    /// Liberty sources commonly put a whole group on one line
    /// (`pin (A) { direction : input ; }`), so a line can open a group,
    /// record attributes, and close groups again; each `{`, `;`, `}`
    /// terminates one segment.
    fn consume_line(&mut self, line: &str) {
        let mut rest = line;
        while !rest.is_empty() {
            if self.ignore_depth > 0 {
                rest = self.skip_ignored(rest);
                continue;
            }

            let candidates = [
                (rest.find('{'), LineToken::GroupOpen),
                (rest.find(';'), LineToken::AttrEnd),
                (rest.find('}'), LineToken::GroupClose),
            ];
            let mut next: Option<(usize, LineToken)> = None;
            for (pos, token) in candidates {
                if let Some(pos) = pos {
                    if next.map_or(true, |(best, _)| pos < best) {
                        next = Some((pos, token));
                    }
                }
            }

            let Some((pos, token)) = next else {
                // no statement marker: drop the remainder
                break;
            };
            match token {
                LineToken::GroupOpen => self.open_group(&rest[..pos]),
                LineToken::AttrEnd => self.push_attribute(&rest[..pos]),
                LineToken::GroupClose => self.close_group(),
            }
            rest = &rest[pos + 1..];
        }
    }

    /// Advance through content belonging to a skipped group, tracking
    /// brace depth. Returns the remainder after the group closes, or ""
    /// if the line ends inside it.
    fn skip_ignored<'a>(&mut self, rest: &'a str) -> &'a str {
        for (i, ch) in rest.char_indices() {
            match ch {
                '{' => self.ignore_depth += 1,
                '}' => {
                    self.ignore_depth -= 1;
                    if self.ignore_depth == 0 {
                        return &rest[i + 1..];
                    }
                }
                _ => {}
            }
        }
        ""
    }

    /// Handle a group header, the text before a `{`.
    fn open_group(&mut self, header: &str) {
        let (name, value) = match header.find('(') {
            Some(lparen) => {
                let name = header[..lparen].trim();
                let value = match header[lparen + 1..].find(')') {
                    Some(rparen) => &header[lparen + 1..lparen + 1 + rparen],
                    None => &header[lparen + 1..],
                };
                (name, value.trim())
            }
            None => (header.trim(), ""),
        };

        // a second top-level group after the root closed is skipped like
        // any non-whitelisted group
        let after_root = self.root.is_some() && self.current_group.is_none();
        if GroupKind::from_name(name).is_none() || after_root {
            self.ignore_depth += 1;
            return;
        }

        let idx = self.nodes.len();
        self.nodes.push(Statement {
            is_group: true,
            name: name.into(),
            value: value.to_owned(),
            parent: self.current_group,
            children: Vec::new(),
        });
        match self.current_group {
            Some(parent) => self.nodes[parent].children.push(idx),
            None => self.root = Some(idx),
        }
        self.current_group = Some(idx);
    }

    /// Handle an attribute statement, the text before a `;`.
    fn push_attribute(&mut self, stmt: &str) {
        let Some(colon) = stmt.find(':') else {
            return;
        };
        let name = stmt[..colon].trim();
        let value = stmt[colon + 1..].trim();
        if AttrKind::from_name(name).is_none() {
            return;
        }
        let Some(parent) = self.current_group else {
            return;
        };

        let idx = self.nodes.len();
        self.nodes.push(Statement {
            is_group: false,
            name: name.into(),
            value: value.to_owned(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
    }

    fn close_group(&mut self) {
        if let Some(cur) = self.current_group {
            self.current_group = self.nodes[cur].parent;
        }
    }
}

/// Strip the outermost double quotes: everything strictly between the
/// first and the last `"`. Values without a quote pair pass through
/// trimmed.
fn prepare_string(value: &str) -> String {
    match (value.find('"'), value.rfind('"')) {
        (Some(first), Some(last)) if first < last => value[first + 1..last].to_owned(),
        _ => value.trim().to_owned(),
    }
}

/// Walk the statement tree at fixed depths
/// (library → cell → pin/ff/latch → leaf attributes) into the typed
/// intermediate library.
fn lift(tree: &TreeBuilder) -> Result<LibertyLibrary, LibertyError> {
    let Some(root) = tree.root else {
        return Err(LibertyError::EmptyInput);
    };
    let root = &tree.nodes[root];
    if GroupKind::from_name(&root.name) != Some(GroupKind::Library) {
        clilog::error!(
            "gate library source does not start with a 'library' group (found '{}')",
            root.name
        );
        return Err(LibertyError::MalformedRoot(root.name.to_string()));
    }

    let mut lib = LibertyLibrary {
        name: root.value.clone(),
        cells: Vec::new(),
    };

    for &s1 in &root.children {
        let s1 = &tree.nodes[s1];
        if !s1.is_group || GroupKind::from_name(&s1.name) != Some(GroupKind::Cell) {
            continue;
        }

        let mut cell = LibertyCell {
            name: s1.value.as_str().into(),
            ..Default::default()
        };

        for &s2 in &s1.children {
            let s2 = &tree.nodes[s2];
            if !s2.is_group {
                continue;
            }
            match GroupKind::from_name(&s2.name) {
                Some(GroupKind::Pin) => {
                    let mut pin = LibertyPin {
                        name: s2.value.as_str().into(),
                        ..Default::default()
                    };
                    for &s3 in &s2.children {
                        let s3 = &tree.nodes[s3];
                        match AttrKind::from_name(&s3.name) {
                            Some(AttrKind::Direction) => pin.direction = Some(s3.value.clone()),
                            Some(AttrKind::Function) => {
                                pin.function = Some(prepare_string(&s3.value))
                            }
                            Some(AttrKind::ThreeState) => {
                                pin.three_state = Some(prepare_string(&s3.value))
                            }
                            Some(AttrKind::XFunction) => {
                                pin.x_function = Some(prepare_string(&s3.value))
                            }
                            _ => {}
                        }
                    }
                    cell.pins.push(pin);
                }
                Some(GroupKind::Ff) => {
                    cell.is_ff = true;
                    for &s3 in &s2.children {
                        let s3 = &tree.nodes[s3];
                        match AttrKind::from_name(&s3.name) {
                            Some(AttrKind::ClockedOn) => {
                                cell.clocked_on = Some(prepare_string(&s3.value))
                            }
                            Some(AttrKind::NextState) => {
                                cell.next_state = Some(prepare_string(&s3.value))
                            }
                            Some(AttrKind::Clear) => cell.clear = Some(prepare_string(&s3.value)),
                            Some(AttrKind::Preset) => {
                                cell.preset = Some(prepare_string(&s3.value))
                            }
                            Some(AttrKind::ClearPresetVar1) => {
                                cell.clear_preset_var1 = Some(prepare_string(&s3.value))
                            }
                            Some(AttrKind::ClearPresetVar2) => {
                                cell.clear_preset_var2 = Some(prepare_string(&s3.value))
                            }
                            _ => {}
                        }
                    }
                }
                Some(GroupKind::Latch) => {
                    cell.is_latch = true;
                    // latch attributes keep the raw value, quotes included
                    for &s3 in &s2.children {
                        let s3 = &tree.nodes[s3];
                        match AttrKind::from_name(&s3.name) {
                            Some(AttrKind::Enable) => cell.enable = Some(s3.value.clone()),
                            Some(AttrKind::DataIn) => cell.data_in = Some(s3.value.clone()),
                            Some(AttrKind::Clear) => cell.clear = Some(s3.value.clone()),
                            Some(AttrKind::Preset) => cell.preset = Some(s3.value.clone()),
                            Some(AttrKind::ClearPresetVar1) => {
                                cell.clear_preset_var1 = Some(s3.value.clone())
                            }
                            Some(AttrKind::ClearPresetVar2) => {
                                cell.clear_preset_var2 = Some(s3.value.clone())
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        lib.cells.push(cell);
    }

    Ok(lib)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrub_line_comment() {
        let (line, block) = scrub_comments("cell (X) { // trailing", false);
        assert_eq!(line, "cell (X) { ");
        assert!(!block);
    }

    #[test]
    fn scrub_block_comment_within_line() {
        let (line, block) = scrub_comments("a /* hidden */ b", false);
        assert_eq!(line, "a  b");
        assert!(!block);
    }

    #[test]
    fn scrub_two_blocks_one_line() {
        let (line, block) = scrub_comments("a /* b */ c /* d */ e", false);
        assert_eq!(line, "a  c  e");
        assert!(!block);
    }

    #[test]
    fn scrub_block_comment_opens() {
        let (line, block) = scrub_comments("a /* rest of line", false);
        assert_eq!(line, "a ");
        assert!(block);
    }

    #[test]
    fn scrub_block_comment_closes() {
        let (line, block) = scrub_comments("rest */ b", true);
        assert_eq!(line, " b");
        assert!(!block);
    }

    #[test]
    fn scrub_line_fully_inside_block() {
        let (line, block) = scrub_comments("cell (GONE) {", true);
        assert_eq!(line, "");
        assert!(block);
    }

    #[test]
    fn scrub_line_comment_wins_when_first() {
        let (line, block) = scrub_comments("x // then /* never opened", false);
        assert_eq!(line, "x ");
        assert!(!block);
    }

    #[test]
    fn prepare_string_extracts_between_quotes() {
        assert_eq!(prepare_string("\"A & B\""), "A & B");
        assert_eq!(prepare_string("  \"0\"  "), "0");
    }

    #[test]
    fn prepare_string_without_quote_pair_keeps_input() {
        assert_eq!(prepare_string(" CLK "), "CLK");
        assert_eq!(prepare_string("\"half"), "\"half");
    }

    const MINIMAL: &str = r#"
library (demo) {
  cell (BUF) {
    pin (A) { direction : input ; }
    pin (Y) { direction : output ; function : "A" ; }
  }
}
"#;

    #[test]
    fn parses_minimal_library() {
        let lib = LibertyLibrary::parse_str(MINIMAL).unwrap();
        assert_eq!(lib.name, "demo");
        assert_eq!(lib.cells.len(), 1);

        let cell = &lib.cells[0];
        assert_eq!(cell.name, "BUF");
        assert!(!cell.is_ff);
        assert!(!cell.is_latch);
        assert_eq!(cell.pins.len(), 2);
        assert_eq!(cell.pins[0].name, "A");
        assert_eq!(cell.pins[0].direction.as_deref(), Some("input"));
        assert_eq!(cell.pins[1].name, "Y");
        assert_eq!(cell.pins[1].direction.as_deref(), Some("output"));
        assert_eq!(cell.pins[1].function.as_deref(), Some("A"));
    }

    #[test]
    fn single_line_library_parses() {
        let lib = LibertyLibrary::parse_str(
            r#"library (oneline) { cell (TIE0) { pin (Z) { direction : output ; function : "0" ; } } }"#,
        )
        .unwrap();
        assert_eq!(lib.name, "oneline");
        assert_eq!(lib.cells.len(), 1);
        assert_eq!(lib.cells[0].pins[0].function.as_deref(), Some("0"));
    }

    #[test]
    fn ff_cell_strips_quotes() {
        let lib = LibertyLibrary::parse_str(
            r#"
library (seq) {
  cell (DFFQ) {
    ff (IQ, IQN) {
      clocked_on : "CLK" ;
      next_state : "D" ;
      clear : "RN'" ;
    }
    pin (CLK) { direction : input ; }
    pin (D) { direction : input ; }
    pin (Q) { direction : output ; function : "IQ" ; }
  }
}
"#,
        )
        .unwrap();
        let cell = &lib.cells[0];
        assert!(cell.is_ff);
        assert!(!cell.is_latch);
        assert_eq!(cell.clocked_on.as_deref(), Some("CLK"));
        assert_eq!(cell.next_state.as_deref(), Some("D"));
        assert_eq!(cell.clear.as_deref(), Some("RN'"));
        assert_eq!(cell.preset, None);
        assert_eq!(cell.pins.len(), 3);
    }

    #[test]
    fn latch_cell_keeps_quotes() {
        let lib = LibertyLibrary::parse_str(
            r#"
library (seq) {
  cell (DLQ) {
    latch (IQ, IQN) { enable : "G" ; data_in : "D" ; }
    pin (G) { direction : input ; }
    pin (D) { direction : input ; }
    pin (Q) { direction : output ; }
  }
}
"#,
        )
        .unwrap();
        let cell = &lib.cells[0];
        assert!(cell.is_latch);
        assert!(!cell.is_ff);
        assert_eq!(cell.enable.as_deref(), Some("\"G\""));
        assert_eq!(cell.data_in.as_deref(), Some("\"D\""));
    }

    #[test]
    fn comments_hide_cells() {
        let lib = LibertyLibrary::parse_str(
            r#"
library (demo) {
  /* cell (HIDDEN) {
    pin (A) { direction : input ; }
  } */
  // cell (LINE_HIDDEN) {
  cell (REAL) {
    pin (A) { direction : input ; }
  }
}
"#,
        )
        .unwrap();
        assert_eq!(lib.cells.len(), 1);
        assert_eq!(lib.cells[0].name, "REAL");
    }

    #[test]
    fn unknown_groups_skipped_with_nesting() {
        let lib = LibertyLibrary::parse_str(
            r#"
library (demo) {
  operating_conditions (typical) { process : 1 ; }
  cell (AND2) {
    pin (A) { direction : input ; }
    pin (B) { direction : input ; }
    pin (Y) {
      direction : output ;
      function : "(A * B)" ;
      timing () {
        related_pin : "A" ;
        cell_rise (scalar) { values ( "0.1" ) ; }
      }
    }
  }
  cell (INV) {
    pin (A) { direction : input ; }
    pin (Y) { direction : output ; function : "!A" ; }
  }
}
"#,
        )
        .unwrap();
        assert_eq!(lib.cells.len(), 2);
        let and2 = &lib.cells[0];
        assert_eq!(and2.name, "AND2");
        assert_eq!(and2.pins.len(), 3);
        assert_eq!(and2.pins[2].function.as_deref(), Some("(A * B)"));
        assert_eq!(lib.cells[1].name, "INV");
    }

    #[test]
    fn cell_with_only_unknown_groups_is_empty() {
        let lib = LibertyLibrary::parse_str(
            r#"
library (demo) {
  cell (ODD) {
    leakage_power () { value : 1.0 ; }
    statetable ("A", "B") { table : "H L" ; }
  }
}
"#,
        )
        .unwrap();
        let cell = &lib.cells[0];
        assert_eq!(cell.name, "ODD");
        assert!(cell.pins.is_empty());
        assert!(!cell.is_ff);
        assert!(!cell.is_latch);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            LibertyLibrary::parse_str(""),
            Err(LibertyError::EmptyInput)
        ));
        assert!(matches!(
            LibertyLibrary::parse_str("/* nothing */ // to see"),
            Err(LibertyError::EmptyInput)
        ));
    }

    #[test]
    fn wrong_root_is_an_error() {
        let err = LibertyLibrary::parse_str("cell (X) { pin (A) { direction : input ; } }")
            .unwrap_err();
        match err {
            LibertyError::MalformedRoot(name) => assert_eq!(name, "cell"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unterminated_block_comment_swallows_rest() {
        let lib = LibertyLibrary::parse_str(
            r#"
library (demo) {
  cell (SEEN) { pin (A) { direction : input ; } }
  /* cell (UNSEEN) {
  }
}
"#,
        )
        .unwrap();
        assert_eq!(lib.cells.len(), 1);
        assert_eq!(lib.cells[0].name, "SEEN");
    }

    #[test]
    fn stray_statements_are_dropped() {
        let lib = LibertyLibrary::parse_str(
            r#"
direction : input ;
library (demo) {
  cell (X) { pin (A) { direction : input ; } }
}
technology (cmos) { foo : 1 ; }
"#,
        )
        .unwrap();
        assert_eq!(lib.name, "demo");
        assert_eq!(lib.cells.len(), 1);
        assert_eq!(lib.cells[0].pins.len(), 1);
    }
}
