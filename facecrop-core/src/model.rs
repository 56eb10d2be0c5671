use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use tract_onnx::prelude::{
    Datum, Framework, Graph, InferenceFact, InferenceModel, InferenceModelExt, IntoTensor,
    SimplePlan, Tensor, TypedFact, TypedOp, tvec,
};

use crate::postprocess::ROW_COLS;
use crate::preprocess::{InputMode, InputSize};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

const STRIDES: [usize; 3] = [8, 16, 32];
const OUTPUTS_PER_STRIDE: usize = 4; // cls, obj, bbox, kps

/// YuNet ONNX graph plus a runnable plan for the current input size.
///
/// The parsed graph is kept so the plan can be rebuilt whenever the input
/// size changes, which happens whenever consecutive images differ in size.
/// Graphs exported with a fixed input shape are planned once and stay in
/// [`InputMode::Fixed`].
pub struct YuNetModel {
    source: InferenceModel,
    runnable: RunnableModel,
    input_size: InputSize,
    mode: InputMode,
}

impl std::fmt::Debug for YuNetModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YuNetModel")
            .field("input_size", &self.input_size)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl YuNetModel {
    /// Parse the ONNX graph and plan it for the default input size.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let source = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?;

        let input_size = InputSize::default();
        match plan_for_size(&source, input_size) {
            Ok(runnable) => {
                debug!(
                    "YuNet model {} planned with dynamic input ({}x{})",
                    path.display(),
                    input_size.width,
                    input_size.height
                );
                Ok(Self {
                    source,
                    runnable,
                    input_size,
                    mode: InputMode::Padded,
                })
            }
            Err(resize_err) => {
                debug!(
                    "YuNet model {} rejected an input override ({resize_err:#}); using its declared shape",
                    path.display()
                );
                let (runnable, fixed) = plan_declared(&source)
                    .with_context(|| format!("unable to plan YuNet graph {}", path.display()))?;
                Ok(Self {
                    source,
                    runnable,
                    input_size: fixed,
                    mode: InputMode::Fixed(fixed),
                })
            }
        }
    }

    pub fn input_mode(&self) -> InputMode {
        self.mode
    }

    pub fn input_size(&self) -> InputSize {
        self.input_size
    }

    /// Make the plan match `size`, rebuilding it only when the size changed.
    ///
    /// Fixed-shape graphs ignore the request.
    pub fn set_input_size(&mut self, size: InputSize) -> Result<()> {
        if matches!(self.mode, InputMode::Fixed(_)) || size == self.input_size {
            return Ok(());
        }
        self.runnable = plan_for_size(&self.source, size)?;
        self.input_size = size;
        debug!("YuNet plan rebuilt for {}x{}", size.width, size.height);
        Ok(())
    }

    /// Run the network and return decoded rows of shape `[N, 15]` in input
    /// tensor coordinates.
    pub fn run(&self, input: Tensor) -> Result<Tensor> {
        let outputs = self
            .runnable
            .run(tvec![input.into()])
            .map_err(|e| anyhow::anyhow!("YuNet execution failed: {e}"))?;

        let mut tensors: Vec<Tensor> = outputs
            .into_iter()
            .map(|value| value.into_tensor())
            .collect();

        match tensors.len() {
            1 => tensors
                .pop()
                .ok_or_else(|| anyhow::anyhow!("YuNet model produced no outputs")),
            len if len == STRIDES.len() * OUTPUTS_PER_STRIDE => {
                decode_yunet_outputs(&tensors, self.input_size)
            }
            other => anyhow::bail!(
                "unexpected number of YuNet outputs: expected 1 or {}, got {}",
                STRIDES.len() * OUTPUTS_PER_STRIDE,
                other
            ),
        }
    }
}

fn plan_for_size(source: &InferenceModel, size: InputSize) -> Result<RunnableModel> {
    let shape = [1usize, 3, size.height as usize, size.width as usize];
    let model = source
        .clone()
        .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), shape))
        .map_err(|e| anyhow::anyhow!("unable to set YuNet input shape: {e}"))?;
    optimize_or_declutter(model)
}

fn plan_declared(source: &InferenceModel) -> Result<(RunnableModel, InputSize)> {
    let typed = source
        .clone()
        .into_typed()
        .map_err(|e| anyhow::anyhow!("unable to type-check YuNet graph: {e}"))?;
    let fact = typed
        .input_fact(0)
        .map_err(|e| anyhow::anyhow!("YuNet graph has no input: {e}"))?;
    let size = match fact.shape.as_concrete() {
        Some([_, _, h, w]) => InputSize::new(*w as u32, *h as u32),
        other => anyhow::bail!("YuNet input shape must be [1, 3, H, W], got {other:?}"),
    };
    Ok((optimize_or_declutter(source.clone())?, size))
}

fn optimize_or_declutter(model: InferenceModel) -> Result<RunnableModel> {
    match model
        .clone()
        .into_optimized()
        .and_then(|optimized| optimized.into_runnable())
    {
        Ok(runnable) => Ok(runnable),
        Err(opt_err) => {
            warn!("YuNet graph failed to optimize ({opt_err}); falling back to decluttered graph");
            model
                .into_typed()
                .and_then(|typed| typed.into_decluttered())
                .and_then(|decluttered| decluttered.into_runnable())
                .map_err(|e| {
                    anyhow::anyhow!(
                        "decluttered YuNet graph failed after optimize error ({opt_err}): {e}"
                    )
                })
        }
    }
}

#[derive(Clone, Copy)]
struct StrideLayout {
    index: usize,
    stride: usize,
    cols: usize,
    rows: usize,
}

impl StrideLayout {
    fn cells(&self) -> usize {
        self.cols * self.rows
    }
}

fn f32_output<'a>(
    outputs: &'a [Tensor],
    index: usize,
    name: &str,
    expected: usize,
) -> Result<&'a [f32]> {
    let slice = outputs[index]
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("{name} output not f32: {e}"))?;
    anyhow::ensure!(
        slice.len() == expected,
        "{name} length mismatch: expected {expected}, got {}",
        slice.len()
    );
    Ok(slice)
}

/// Fuse the twelve per-stride heads (cls, obj, bbox, kps for strides 8/16/32)
/// into `[N, 15]` rows.
///
/// Score is `sqrt(cls * obj)`; box centres are `(cell + d) * stride` with
/// `exp(dw) * stride` extents; landmarks are `(cell + d) * stride`.
pub(crate) fn decode_yunet_outputs(outputs: &[Tensor], input_size: InputSize) -> Result<Tensor> {
    anyhow::ensure!(
        outputs.len() == STRIDES.len() * OUTPUTS_PER_STRIDE,
        "YuNet decode expects {} tensors, got {}",
        STRIDES.len() * OUTPUTS_PER_STRIDE,
        outputs.len()
    );

    let aligned = InputSize::aligned(input_size.width, input_size.height);
    let layouts: Vec<StrideLayout> = STRIDES
        .iter()
        .enumerate()
        .map(|(index, &stride)| StrideLayout {
            index,
            stride,
            cols: aligned.width as usize / stride,
            rows: aligned.height as usize / stride,
        })
        .collect();
    let total_cells: usize = layouts.iter().map(StrideLayout::cells).sum();

    let mut fused = Vec::with_capacity(total_cells * ROW_COLS);
    let heads = STRIDES.len();

    for layout in &layouts {
        let cells = layout.cells();
        let cls = f32_output(outputs, layout.index, "cls", cells)?;
        let obj = f32_output(outputs, layout.index + heads, "obj", cells)?;
        let bbox = f32_output(outputs, layout.index + heads * 2, "bbox", cells * 4)?;
        let kps = f32_output(outputs, layout.index + heads * 3, "kps", cells * 10)?;
        let stride = layout.stride as f32;

        for row in 0..layout.rows {
            for col in 0..layout.cols {
                let idx = row * layout.cols + col;
                let score = (cls[idx].clamp(0.0, 1.0) * obj[idx].clamp(0.0, 1.0)).sqrt();

                let b = &bbox[idx * 4..idx * 4 + 4];
                let cx = (col as f32 + b[0]) * stride;
                let cy = (row as f32 + b[1]) * stride;
                let w = b[2].exp() * stride;
                let h = b[3].exp() * stride;
                fused.extend_from_slice(&[
                    (-0.5f32).mul_add(w, cx),
                    (-0.5f32).mul_add(h, cy),
                    w,
                    h,
                ]);

                for point in kps[idx * 10..idx * 10 + 10].chunks_exact(2) {
                    fused.push((point[0] + col as f32) * stride);
                    fused.push((point[1] + row as f32) * stride);
                }

                fused.push(if score.is_finite() { score } else { 0.0 });
            }
        }
    }

    Tensor::from_shape(&[total_cells, ROW_COLS], &fused)
        .map_err(|e| anyhow::anyhow!("failed to build fused YuNet tensor: {e}"))
}
