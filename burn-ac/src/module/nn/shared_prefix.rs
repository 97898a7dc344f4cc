//! Copies the leading layers of one module into another.
//!
//! Parameters are walked in the module's visitation order (field declaration order). A layer
//! starts at every float parameter of rank two or more and also owns the rank one parameters
//! that follow it, so a linear layer is its weight together with its bias.

use burn::{
    module::{ModuleMapper, ModuleVisitor, ParamId},
    prelude::*,
};
use std::{any::Any, marker::PhantomData};
use tracing::debug;

use crate::{Error, Result};

/// Admits parameters while they belong to the first `n_layers` layers.
struct LayerPrefix {
    n_layers: usize,
    layers: usize,
    full: bool,
}

impl LayerPrefix {
    fn new(n_layers: usize) -> Self {
        Self {
            n_layers,
            layers: 0,
            full: false,
        }
    }

    fn admit<const D: usize>(&mut self) -> bool {
        if self.full {
            return false;
        }
        if D > 1 || self.layers == 0 {
            if self.layers == self.n_layers {
                self.full = true;
                return false;
            }
            self.layers += 1;
        }
        true
    }
}

struct PrefixReader<B: Backend> {
    prefix: LayerPrefix,
    shapes: Vec<Vec<usize>>,
    tensors: Vec<Box<dyn Any + Send>>, // Tensor<B, D> for the parameter's own rank
    backend: PhantomData<B>,
}

impl<B: Backend> PrefixReader<B> {
    fn read<M: Module<B>>(module: &M, n_layers: usize) -> Self {
        let mut reader = PrefixReader {
            prefix: LayerPrefix::new(n_layers),
            shapes: Vec::new(),
            tensors: Vec::new(),
            backend: PhantomData,
        };
        module.visit(&mut reader);
        reader
    }
}

impl<B: Backend> ModuleVisitor<B> for PrefixReader<B> {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        if self.prefix.admit::<D>() {
            self.shapes.push(tensor.dims().to_vec());
            self.tensors.push(Box::new(tensor.clone()));
        }
    }
}

struct PrefixWriter<B: Backend> {
    tensors: std::vec::IntoIter<Box<dyn Any + Send>>,
    backend: PhantomData<B>,
}

impl<B: Backend> ModuleMapper<B> for PrefixWriter<B> {
    fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        match self.tensors.next().map(|item| item.downcast::<Tensor<B, D>>()) {
            // Detach so the copy shares no graph with the source parameter.
            Some(Ok(shared)) => {
                let require_grad = tensor.is_require_grad();
                shared.detach().set_require_grad(require_grad)
            }
            _ => tensor,
        }
    }
}

/// Returns `target` with its first `n_layers` layers replaced by copies of the corresponding
/// layers of `source`.
pub fn splice_prefix<B: Backend, S: Module<B>, T: Module<B>>(
    source: &S,
    target: T,
    n_layers: usize,
) -> Result<T> {
    let source_prefix = PrefixReader::<B>::read(source, n_layers);
    let target_prefix = PrefixReader::<B>::read(&target, n_layers);
    if source_prefix.prefix.layers < n_layers || target_prefix.prefix.layers < n_layers {
        return Err(Error::SharedPrefix(format!(
            "expected {} layers, source has {} and target has {}",
            n_layers, source_prefix.prefix.layers, target_prefix.prefix.layers
        )));
    }
    if source_prefix.shapes != target_prefix.shapes {
        return Err(Error::SharedPrefix(format!(
            "parameter shapes differ, source {:?} and target {:?}",
            source_prefix.shapes, target_prefix.shapes
        )));
    }
    debug!(
        n_layers,
        n_tensors = source_prefix.shapes.len(),
        "Copying shared layers"
    );
    let mut writer = PrefixWriter {
        tensors: source_prefix.tensors.into_iter(),
        backend: PhantomData,
    };
    Ok(target.map(&mut writer))
}

/// Snapshot of the parameters of the first `n_layers` layers of a module.
pub fn prefix_data<B: Backend, M: Module<B>>(module: &M, n_layers: usize) -> Vec<TensorData> {
    struct DataReader {
        prefix: LayerPrefix,
        data: Vec<TensorData>,
    }

    impl<B2: Backend> ModuleVisitor<B2> for DataReader {
        fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B2, D>) {
            if self.prefix.admit::<D>() {
                self.data.push(tensor.to_data());
            }
        }
    }

    let mut reader = DataReader {
        prefix: LayerPrefix::new(n_layers),
        data: Vec::new(),
    };
    module.visit(&mut reader);
    reader.data
}
