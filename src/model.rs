use crate::cost::Cost;
use crate::error::{Error, Result};
use crate::layers::Layer;
use crate::logging::{round3, BatchEnd, Callback, EpochEnd};
use crate::math::Matrix;
use crate::optim::Optimiser;

/// Ordered stack of layers trained against one cost with one optimiser.
///
/// Layers run in insertion order on the forward pass and in reverse on the
/// backward pass. The per-epoch mean losses of every `train` call are kept in
/// [`Model::training_loss`].
pub struct Model {
    layers: Vec<Box<dyn Layer>>,
    cost: Box<dyn Cost>,
    optimiser: Box<dyn Optimiser>,
    training_loss: Vec<f64>,
}

impl Model {
    pub fn new<O, C>(optimiser: O, cost: C) -> Self
    where
        O: Optimiser + 'static,
        C: Cost + 'static,
    {
        Self {
            layers: Vec::new(),
            cost: Box::new(cost),
            optimiser: Box::new(optimiser),
            training_loss: Vec::new(),
        }
    }

    /// Append a layer to the end of the network.
    pub fn add<L: Layer + 'static>(&mut self, layer: L) {
        self.layers.push(Box::new(layer));
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Box<dyn Layer>] {
        &mut self.layers
    }

    pub fn cost(&self) -> &dyn Cost {
        self.cost.as_ref()
    }

    pub fn optimiser(&self) -> &dyn Optimiser {
        self.optimiser.as_ref()
    }

    pub fn training_loss(&self) -> &[f64] {
        &self.training_loss
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Run every layer in order and return the last layer's output.
    pub fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig("model has no layers".to_string()));
        }
        let mut out = input.clone();
        for layer in self.layers.iter_mut() {
            out = layer.forward(&out)?;
        }
        Ok(out)
    }

    /// Same path as [`Model::forward`]; layer caches are refreshed too.
    pub fn predict(&mut self, input: &Matrix) -> Result<Matrix> {
        self.forward(input)
    }

    /// Push `grad` through the layers in reverse. Returns the gradient with
    /// respect to the network input, i.e. the first layer's input gradient.
    pub fn backward(&mut self, grad: &Matrix) -> Result<Matrix> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig("model has no layers".to_string()));
        }
        let mut grad = grad.clone();
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
        }
        Ok(grad)
    }

    /// Apply the optimiser to every layer in forward order.
    pub fn update_parameters(&mut self) -> Result<()> {
        for layer in self.layers.iter_mut() {
            self.optimiser.update(layer.as_mut())?;
        }
        Ok(())
    }

    /// One forward / cost / backward / update cycle. Returns the unrounded
    /// batch loss.
    pub fn train_on_batch(&mut self, inputs: &Matrix, labels: &Matrix) -> Result<f64> {
        let pred = self.forward(inputs)?;
        let loss = self.cost.forward(&pred, labels)?;
        let grad = self.cost.backward(&pred, labels)?;
        self.backward(&grad)?;
        self.update_parameters()?;
        Ok(loss)
    }

    /// Mini-batch training over `data` in row order.
    ///
    /// Batches are taken while a full batch of `batch_size` rows remains, so
    /// a trailing partial batch is dropped. Shuffling is up to the caller.
    pub fn train(
        &mut self,
        data: &Matrix,
        labels: &Matrix,
        epochs: usize,
        batch_size: usize,
        callbacks: &mut [&mut dyn Callback],
    ) -> Result<()> {
        if data.rows() != labels.rows() {
            return Err(Error::ShapeMismatch(format!(
                "{} data rows but {} label rows",
                data.rows(),
                labels.rows()
            )));
        }
        if !data.can_slice_rows(0, batch_size) {
            return Err(Error::InvalidRange(format!(
                "batch size {batch_size} yields no batch from {} rows",
                data.rows()
            )));
        }

        log::debug!(
            "Training {} layers on {} rows, {} epochs of batch {}",
            self.layers.len(),
            data.rows(),
            epochs,
            batch_size
        );
        for cb in callbacks.iter_mut() {
            cb.on_train_begin();
        }
        for epoch in 1..=epochs {
            let mean = self.train_epoch(data, labels, batch_size, epoch, callbacks)?;
            self.training_loss.push(mean);
            let event = EpochEnd { epoch, loss: mean };
            for cb in callbacks.iter_mut() {
                cb.on_epoch_end(&event);
            }
        }
        for cb in callbacks.iter_mut() {
            cb.on_train_end();
        }
        Ok(())
    }

    fn train_epoch(
        &mut self,
        data: &Matrix,
        labels: &Matrix,
        batch_size: usize,
        epoch: usize,
        callbacks: &mut [&mut dyn Callback],
    ) -> Result<f64> {
        let mut offset = 0;
        let mut batch = 1;
        let mut losses = Vec::new();

        while data.can_slice_rows(offset, batch_size) {
            let x = data.slice_rows(offset, batch_size)?;
            let y = labels.slice_rows(offset, batch_size)?;
            let loss = self.train_on_batch(&x, &y)?;
            losses.push(loss);

            let event = BatchEnd {
                epoch,
                batch,
                loss: round3(loss),
            };
            for cb in callbacks.iter_mut() {
                cb.on_batch_end(&event);
            }
            offset += batch_size;
            batch += 1;
        }

        Ok(round3(losses.iter().sum::<f64>() / losses.len() as f64))
    }

    /// Fraction of rows whose predicted argmax matches the label argmax.
    pub fn evaluate(&mut self, data: &Matrix, labels: &Matrix) -> Result<f64> {
        if data.rows() != labels.rows() {
            return Err(Error::ShapeMismatch(format!(
                "{} data rows but {} label rows",
                data.rows(),
                labels.rows()
            )));
        }
        let mut correct = 0usize;
        for row in 0..data.rows() {
            let x = data.slice_rows(row, 1)?;
            let y = labels.slice_rows(row, 1)?;
            let pred = self.predict(&x)?;
            if pred.argmax() == y.argmax() {
                correct += 1;
            }
        }
        Ok(correct as f64 / data.rows() as f64)
    }
}
