use log::{debug, trace};

use crate::tape::{TapeNode, TapeTerm, TapeValue};

/// Orders every node reachable from `root` so that each node comes after its
/// operands (DFS postorder). The visited set is keyed by tape position.
///
/// Uses an explicit stack; long chains would overflow the call stack otherwise.
pub(crate) fn topo_order(nodes: &[TapeNode], root: u32) -> Vec<u32> {
    let mut visited = vec![false; nodes.len()];
    let mut order = vec![];
    // (node, operands already scheduled)
    let mut stack = vec![(root, false)];
    while let Some((idx, expanded)) = stack.pop() {
        if expanded {
            order.push(idx);
            continue;
        }
        if visited[idx as usize] {
            continue;
        }
        visited[idx as usize] = true;
        stack.push((idx, true));
        let operands = nodes[idx as usize].value.operands();
        for operand in operands.into_iter().flatten().rev() {
            if !visited[operand as usize] {
                stack.push((operand, false));
            }
        }
    }
    order
}

fn seed_and_sort(nodes: &mut [TapeNode], root: u32) -> Vec<u32> {
    let root_node = &mut nodes[root as usize];
    if root_node.grad == 0. {
        root_node.grad = 1.;
    }
    let order = topo_order(nodes, root);
    debug!(
        "backprop from {:?} over {} nodes",
        nodes[root as usize].name,
        order.len()
    );
    order
}

/// Applies the local derivative rule of one node, adding its share into the
/// gradients of its operands. Leaves have nothing to propagate.
fn propagate(nodes: &mut [TapeNode], idx: u32) {
    use TapeValue::*;
    let node = &nodes[idx as usize];
    let (value, data, grad) = (node.value, node.data, node.grad);
    if !matches!(value, Value(_)) {
        trace!("propagate {:?}: grad {grad} through {value:?}", node.name);
    }
    match value {
        Value(_) => (),
        Add(lhs, rhs) => {
            nodes[lhs as usize].grad += grad;
            nodes[rhs as usize].grad += grad;
        }
        Mul(lhs, rhs) => {
            let (lhs_data, rhs_data) = (nodes[lhs as usize].data, nodes[rhs as usize].data);
            nodes[lhs as usize].grad += rhs_data * grad;
            nodes[rhs as usize].grad += lhs_data * grad;
        }
        // x^0 is constant; powf(0, -1) would turn the zero into NaN
        Pow(_, exponent) if exponent == 0. => (),
        Pow(term, exponent) => {
            let x = nodes[term as usize].data;
            nodes[term as usize].grad += exponent * x.powf(exponent - 1.) * grad;
        }
        Exp(term) => nodes[term as usize].grad += data * grad,
        Tanh(term) => nodes[term as usize].grad += (1. - data * data) * grad,
    }
}

impl<'a> TapeTerm<'a> {
    /// Every node reachable from this term, operands before the terms using them.
    pub fn topo_sort(&self) -> Vec<TapeTerm<'a>> {
        let nodes = self.tape.nodes.borrow();
        topo_order(&nodes, self.idx)
            .into_iter()
            .map(|idx| TapeTerm {
                tape: self.tape,
                idx,
            })
            .collect()
    }

    /// Accumulates d(self)/d(node) into the gradient of every reachable node.
    ///
    /// The gradient of `self` is seeded with 1 only if it is still zero, and
    /// gradients are never cleared, so calling this twice adds up twice.
    /// Use [`TapeTerm::zero_grad`] in between to start over.
    pub fn backprop(&self) {
        let mut nodes = self.tape.nodes.borrow_mut();
        let order = seed_and_sort(&mut nodes, self.idx);
        for &idx in order.iter().rev() {
            propagate(&mut nodes, idx);
        }
        debug!("backprop done, {} nodes visited", order.len());
    }

    /// Same as [`TapeTerm::backprop`], calling `callback` after each node has
    /// propagated. The tape is not borrowed during the callback, so it can
    /// render the intermediate state.
    pub fn backprop_cb(&self, mut callback: impl FnMut(TapeTerm<'a>)) {
        let order = seed_and_sort(&mut self.tape.nodes.borrow_mut(), self.idx);
        for &idx in order.iter().rev() {
            propagate(&mut self.tape.nodes.borrow_mut(), idx);
            callback(TapeTerm {
                tape: self.tape,
                idx,
            });
        }
        debug!("backprop done, {} nodes visited", order.len());
    }

    /// Clears the gradient of every node reachable from this term.
    pub fn zero_grad(&self) {
        let mut nodes = self.tape.nodes.borrow_mut();
        let order = topo_order(&nodes, self.idx);
        for &idx in &order {
            nodes[idx as usize].grad = 0.;
        }
        debug!("zero_grad cleared {} nodes", order.len());
    }
}
