//! Reverse-mode gradient propagation.
//!
//! # Backward Engine
//!
//! [`Graph::backward`] differentiates a root tensor (conventionally the
//! scalar loss) with respect to every gradient-tracking tensor it depends on.
//!
//! ## Algorithm
//!
//! 1. The root's gradient is overwritten with ones.
//! 2. An iterative depth-first walk from the root collects every reachable
//!    node exactly once, in post-order: a node is emitted only after all of
//!    its predecessors.
//! 3. That order is walked in reverse. Each node with a gradient rule hands
//!    its own (by then fully accumulated) gradient to the rule, and the
//!    resulting contributions are added into the predecessors' gradients.
//!
//! Leaves keep whatever accumulated in their gradient buffers, ready for an
//! optimizer. Gradients are never zeroed here; callers zero parameters
//! between steps.
//!
//! ## Example
//!
//! ```rust
//! use much::graph::Graph;
//! use much::tensors::Tensor;
//!
//! let mut graph = Graph::new();
//! let x = graph.insert(Tensor::from_vec(&[1], vec![3.0], true).unwrap());
//! let y = graph.mul(x, x).unwrap();
//! graph.backward(y).unwrap();
//! assert_eq!(graph[x].grad(), Some(&[6.0][..]));
//! ```

use crate::error::{Error, Result};
use crate::graph::{Graph, TensorId};
use crate::ops::dispatch;
use crate::tensors::Tensor;

impl Graph {
    /// Linearizes everything reachable from `root` in dependency order.
    ///
    /// Every node appears once, after all of its predecessors; `root` is
    /// last. Shared sub-expressions are visited a single time.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if `root` is stale
    /// - [`Error::AllocationFailure`] if the traversal bookkeeping cannot be allocated
    pub fn topological_order(&self, root: TensorId) -> Result<Vec<TensorId>> {
        self.node(root)?;

        let reachable = root.index + 1;
        let mut visited = Vec::new();
        visited.try_reserve_exact(reachable)?;
        visited.resize(reachable, false);

        let mut order = Vec::new();
        let mut stack: Vec<(TensorId, usize)> = Vec::new();
        stack.try_reserve(16)?;

        visited[root.index] = true;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (id, next) = *frame;
            let predecessors = &self.nodes[id.index].predecessors;

            if let Some(&pred) = predecessors.get(next) {
                frame.1 += 1;
                if !visited[pred.index] {
                    visited[pred.index] = true;
                    stack.try_reserve(1)?;
                    stack.push((pred, 0));
                }
            } else {
                stack.pop();
                order.try_reserve(1)?;
                order.push(id);
            }
        }

        Ok(order)
    }

    /// Propagates gradients from `root` into every tensor it depends on.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if `root` is stale or does not track gradients
    /// - [`Error::AllocationFailure`] if the traversal bookkeeping cannot be allocated
    pub fn backward(&mut self, root: TensorId) -> Result<()> {
        // nothing is mutated until the traversal has succeeded
        let order = self.topological_order(root)?;
        let seed = self
            .tensor_mut(root)?
            .grad_mut()
            .ok_or(Error::InvalidState("backward on a tensor that does not track gradients"))?;
        seed.fill(1.0);
        log::debug!("backward over {} nodes from {:?}", order.len(), root);

        for &id in order.iter().rev() {
            let node = &self.nodes[id.index];
            let Some(rule) = node.rule else {
                continue;
            };

            let inputs: Vec<&Tensor> = node
                .predecessors
                .iter()
                .map(|pred| &self.nodes[pred.index].tensor)
                .collect();
            let contributions = dispatch::backward(rule, &node.tensor, &inputs)?;
            let predecessors = node.predecessors.clone();

            for (pred, contribution) in predecessors.into_iter().zip(contributions) {
                if let Some(grad) = contribution {
                    self.nodes[pred.index].tensor.accumulate_grad(&grad);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(graph: &mut Graph, value: f32, requires_grad: bool) -> TensorId {
        graph.insert(Tensor::from_vec(&[1], vec![value], requires_grad).unwrap())
    }

    #[test]
    fn order_is_post_order_without_duplicates() {
        let mut graph = Graph::new();
        let x = scalar(&mut graph, 2.0, true);
        let a = graph.sigmoid(x).unwrap();
        let b = graph.leaky_relu(x).unwrap();
        let y = graph.add(a, b).unwrap();

        let order = graph.topological_order(y).unwrap();

        assert_eq!(order.len(), 4);
        assert_eq!(order[0], x);
        assert_eq!(*order.last().unwrap(), y);
        let pos = |id| order.iter().position(|&o| o == id).unwrap();
        assert!(pos(a) < pos(y) && pos(b) < pos(y));
    }

    #[test]
    fn unreachable_nodes_are_skipped() {
        let mut graph = Graph::new();
        let x = scalar(&mut graph, 1.0, true);
        let unrelated = scalar(&mut graph, 5.0, true);
        let y = graph.mul(x, x).unwrap();

        let order = graph.topological_order(y).unwrap();

        assert!(!order.contains(&unrelated));
    }

    #[test]
    fn self_aliasing_accumulates_both_contributions() {
        let mut graph = Graph::new();
        let x = scalar(&mut graph, 1.5, true);
        let y = graph.add(x, x).unwrap();

        graph.backward(y).unwrap();

        assert_eq!(graph[x].grad(), Some(&[2.0][..]));
    }

    #[test]
    fn backward_accumulates_across_passes() {
        let mut graph = Graph::new();
        let x = scalar(&mut graph, 4.0, true);
        let c = scalar(&mut graph, 3.0, false);
        let y = graph.mul(x, c).unwrap();

        graph.backward(y).unwrap();
        graph.backward(y).unwrap();

        assert_eq!(graph[x].grad(), Some(&[6.0][..]));
        assert!(graph[c].grad().is_none());
    }

    #[test]
    fn untracked_root_is_invalid() {
        let mut graph = Graph::new();
        let x = scalar(&mut graph, 1.0, false);
        let y = graph.sigmoid(x).unwrap();

        assert!(matches!(graph.backward(y), Err(Error::InvalidState(_))));
    }

    #[test]
    fn root_is_reseeded_rather_than_accumulated() {
        let mut graph = Graph::new();
        let x = scalar(&mut graph, 4.0, true);
        let c = scalar(&mut graph, 3.0, false);
        let y = graph.mul(x, c).unwrap();
        graph.tensor_mut(y).unwrap().grad_mut().unwrap().fill(5.0);

        graph.backward(y).unwrap();

        assert_eq!(graph[y].grad(), Some(&[1.0][..]));
        assert_eq!(graph[x].grad(), Some(&[3.0][..]));
    }

    #[test]
    fn failed_backward_leaves_gradients_untouched() {
        let mut graph = Graph::new();
        let x = scalar(&mut graph, 2.0, true);
        graph.tensor_mut(x).unwrap().grad_mut().unwrap().fill(7.0);
        let cp = graph.checkpoint();
        let stale = graph.sigmoid(x).unwrap();
        graph.rewind(cp).unwrap();
        let live = graph.leaky_relu(x).unwrap();
        graph.tensor_mut(live).unwrap().grad_mut().unwrap().fill(9.0);

        assert!(matches!(graph.backward(stale), Err(Error::InvalidState(_))));
        assert_eq!(graph[x].grad(), Some(&[7.0][..]));
        assert_eq!(graph[live].grad(), Some(&[9.0][..]));
    }
}
