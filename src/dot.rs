//! Graphviz output. Each computed node is drawn as a record holding its label,
//! value and gradient, fed by a separate node for the operator that made it.

use std::{
    fmt::{self, Display},
    io::Write,
};

use crate::{
    error::GradError,
    tape::{TapeNode, TapeTerm},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RankDir {
    #[default]
    LeftRight,
    TopBottom,
    RightLeft,
    BottomTop,
}

impl RankDir {
    fn as_str(&self) -> &'static str {
        match self {
            Self::LeftRight => "LR",
            Self::TopBottom => "TB",
            Self::RightLeft => "RL",
            Self::BottomTop => "BT",
        }
    }
}

/// Options for writing a graph, obtained from [`TapeTerm::dot_builder`].
#[derive(Clone, Copy)]
pub struct DotBuilder<'a> {
    root: TapeTerm<'a>,
    rank_dir: RankDir,
    highlights: Option<u32>,
}

impl<'a> TapeTerm<'a> {
    pub fn dot_builder(&self) -> DotBuilder<'a> {
        DotBuilder {
            root: *self,
            rank_dir: RankDir::default(),
            highlights: None,
        }
    }

    /// Write graphviz dot file to the given writer.
    pub fn dot(&self, writer: &mut impl Write) -> Result<(), GradError> {
        self.dot_builder().dot(writer)
    }
}

impl<'a> DotBuilder<'a> {
    pub fn rank_dir(mut self, rank_dir: RankDir) -> Self {
        self.rank_dir = rank_dir;
        self
    }

    /// Fill the record of `term`, e.g. to mark the node a step just visited.
    pub fn highlights(mut self, term: TapeTerm<'a>) -> Self {
        self.highlights = Some(term.idx);
        self
    }

    pub fn dot(&self, writer: &mut impl Write) -> Result<(), GradError> {
        let nodes = self.root.tape.nodes.borrow();
        let (order, edges) = flatten(&nodes, self.root.idx);

        writeln!(writer, "digraph {{")?;
        writeln!(writer, "\trankdir={}", self.rank_dir.as_str())?;
        for &idx in &order {
            let node = &nodes[idx as usize];
            let style = if self.highlights == Some(idx) {
                ", style=filled, fillcolor=\"#ffff7f\""
            } else {
                ""
            };
            writeln!(
                writer,
                "\t\"a{idx}\" [label=\"{} | data {:.4} | grad {:.4}\", shape=record{style}]",
                escape_record(&node.name),
                node.data,
                node.grad
            )?;
            let op = node.value.op();
            if !op.is_leaf() {
                writeln!(
                    writer,
                    "\t\"a{idx}_op\" [label=\"{}\"]",
                    escape(&op.symbol())
                )?;
            }
        }
        for &idx in &order {
            if !nodes[idx as usize].value.op().is_leaf() {
                writeln!(writer, "\t\"a{idx}_op\" -> \"a{idx}\"")?;
            }
        }
        for (operand, idx) in edges {
            writeln!(writer, "\t\"a{operand}\" -> \"a{idx}_op\"")?;
        }
        writeln!(writer, "}}")?;
        Ok(())
    }
}

impl<'a> Display for DotBuilder<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = vec![];
        self.dot(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

/// Preorder walk from `root`. Returns the nodes, each once, and one
/// `(operand, user)` edge per operand slot.
fn flatten(nodes: &[TapeNode], root: u32) -> (Vec<u32>, Vec<(u32, u32)>) {
    let mut visited = vec![false; nodes.len()];
    let mut order = vec![];
    let mut edges = vec![];
    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
        if visited[idx as usize] {
            continue;
        }
        visited[idx as usize] = true;
        order.push(idx);
        let operands = nodes[idx as usize].value.operands();
        edges.extend(operands.into_iter().flatten().map(|operand| (operand, idx)));
        stack.extend(
            operands
                .into_iter()
                .flatten()
                .rev()
                .filter(|operand| !visited[*operand as usize]),
        );
    }
    (order, edges)
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Record labels additionally treat `{}|<>` as field syntax.
fn escape_record(s: &str) -> String {
    let mut ret = String::with_capacity(s.len());
    for c in escape(s).chars() {
        if matches!(c, '{' | '}' | '|' | '<' | '>') {
            ret.push('\\');
        }
        ret.push(c);
    }
    ret
}
