//! Subtour detection and elimination-cut generation.
//!
//! All solver-returned edge values pass through [`activation`], the
//! single rounding policy of the crate. Detection partitions the
//! edge-bearing vertices into connected components; [`CutPool`] turns
//! illegal components into named elimination constraints and guarantees
//! that no vertex set is cut twice within one solve.

use crate::engine::{LinExpr, Sense, VarId};
use crate::model::Variant;
use std::collections::HashSet;

/// Round a solver-returned edge value to its 0/1 activation.
///
/// This is the only tolerance policy in the crate; every component that
/// interprets engine floats as booleans goes through it.
#[inline]
pub fn activation(x: f64) -> u8 {
    (x + 0.5).floor() as u8
}

/// Partition the vertices touching at least one active edge into
/// connected components, using an iterative depth-first traversal.
///
/// Each returned component is sorted ascending. Together the components
/// cover every edge-bearing vertex exactly once.
pub fn detect_subtours(active: &[Vec<u8>]) -> Vec<Vec<usize>> {
    let n = active.len();
    let mut pool: Vec<usize> = (0..n)
        .filter(|&v| (0..n).any(|w| active[v][w] != 0))
        .collect();
    let mut assigned = vec![false; n];
    let mut subtours = Vec::new();

    while let Some(&start) = pool.first() {
        let mut component = Vec::new();
        let mut stack = vec![start];
        assigned[start] = true;

        while let Some(v) = stack.pop() {
            component.push(v);
            for w in 0..n {
                if active[v][w] != 0 && !assigned[w] {
                    assigned[w] = true;
                    stack.push(w);
                }
            }
        }

        component.sort_unstable();
        subtours.push(component);
        pool.retain(|&v| !assigned[v]);
    }

    subtours
}

/// Walk each connected component along its active edges, producing the
/// vertex sequences reported as truck tours. The component containing
/// vertex 0 comes first.
pub fn trace_tours(active: &[Vec<u8>]) -> Vec<Vec<usize>> {
    let n = active.len();
    let mut visited = vec![false; n];
    let mut tours = Vec::new();

    let starts = std::iter::once(0).chain(1..n);
    for start in starts {
        if visited[start] || (0..n).all(|w| active[start][w] == 0) {
            continue;
        }
        let mut sequence = vec![start];
        visited[start] = true;
        let mut current = start;
        loop {
            match (0..n).find(|&w| active[current][w] != 0 && !visited[w]) {
                Some(next) => {
                    visited[next] = true;
                    sequence.push(next);
                    current = next;
                }
                None => break,
            }
        }
        tours.push(sequence);
    }

    tours
}

/// Destination for generated cuts. Implemented over the engine's
/// `add_constraint` in iterative mode and over the candidate view's
/// lazy injection in callback mode.
pub trait CutSink {
    fn emit(&mut self, expr: LinExpr, sense: Sense, rhs: f64, name: &str);
}

/// Generates subtour-elimination cuts and deduplicates them per solve.
#[derive(Debug, Default)]
pub struct CutPool {
    seen: HashSet<Vec<usize>>,
    counter: usize,
}

impl CutPool {
    pub fn new() -> Self {
        CutPool { seen: HashSet::new(), counter: 0 }
    }

    /// Total number of cuts emitted so far.
    pub fn cuts_added(&self) -> usize {
        self.counter
    }

    /// Emit one elimination cut per illegal subtour. Returns how many
    /// cuts were added in this pass; zero signals loop termination.
    ///
    /// Skip rules: isolated vertices are never a violation; for the
    /// symmetric plain TSP a component larger than half the vertex set
    /// is skipped because its complement yields the equivalent, smaller
    /// constraint; for drone variants a depot-containing component may
    /// be a legitimate partial truck route and is left alone.
    pub fn generate(
        &mut self,
        subtours: &[Vec<usize>],
        variant: Variant,
        edges: &[Vec<VarId>],
        sink: &mut dyn CutSink,
    ) -> usize {
        let node_count = edges.len();
        let mut added = 0;

        for subtour in subtours {
            if subtour.len() <= 1 {
                continue;
            }
            match variant {
                Variant::Tsp => {
                    if subtour.len() > node_count / 2 {
                        continue;
                    }
                }
                Variant::Pdstsp => {
                    if subtour.contains(&0) {
                        continue;
                    }
                }
                Variant::Fstsp => {
                    // both augmented depot nodes count as the depot
                    if subtour.contains(&0) || subtour.contains(&(node_count - 1)) {
                        continue;
                    }
                }
            }
            if !self.seen.insert(subtour.clone()) {
                continue;
            }

            let mut expr = LinExpr::new();
            for (a, &i) in subtour.iter().enumerate() {
                for &j in subtour.iter().skip(a + 1) {
                    expr.add(edges[i][j], 1.0);
                }
            }
            let rhs = (subtour.len() - 1) as f64;
            let name = format!("subtour_{}", self.counter);
            sink.emit(expr, Sense::Le, rhs, &name);
            self.counter += 1;
            added += 1;
        }

        if added > 0 {
            log::debug!("added {} subtour elimination cuts", added);
        }
        added
    }
}
