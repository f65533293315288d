//! Node declarations for every operation in [`crate::ops`].

use crate::config::FilterConfig;
use crate::error::Result;
use crate::latent::{ChannelSelector, Latent};
use crate::ops::{self, BlendMode, Wave, WaveDirection};

use super::{InputKind, InputSpec, Node, NodeInputs, ParamSpec, Params, Resolved};

type RunFn = fn(&NodeInputs<'_>, &Resolved, &FilterConfig) -> Result<Latent>;

/// A node backed by a plain function.
pub struct BuiltinNode {
    id: &'static str,
    display_name: &'static str,
    inputs: &'static [InputSpec],
    params: &'static [ParamSpec],
    run: RunFn,
}

impl BuiltinNode {
    /// Declare a node. `run` receives parameters that already passed validation.
    #[must_use]
    pub const fn new(
        id: &'static str,
        display_name: &'static str,
        inputs: &'static [InputSpec],
        params: &'static [ParamSpec],
        run: RunFn,
    ) -> Self {
        Self {
            id,
            display_name,
            inputs,
            params,
            run,
        }
    }
}

impl std::fmt::Debug for BuiltinNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinNode")
            .field("id", &self.id)
            .field("params", &self.params.len())
            .finish_non_exhaustive()
    }
}

impl Node for BuiltinNode {
    fn id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        self.display_name
    }

    fn inputs(&self) -> &[InputSpec] {
        self.inputs
    }

    fn params(&self) -> &[ParamSpec] {
        self.params
    }

    fn apply(
        &self,
        inputs: &NodeInputs<'_>,
        params: &Params,
        config: &FilterConfig,
    ) -> Result<Latent> {
        config.validate()?;
        let resolved = params.resolve(self.params)?;
        tracing::debug!(node = self.id, ?resolved, "applying node");
        let output = (self.run)(inputs, &resolved, config)?;
        Ok(config.finish(output))
    }
}

const LATENT: &str = "latent";
const LATENT_A: &str = "latent_a";
const LATENT_B: &str = "latent_b";

const SINGLE_INPUT: &[InputSpec] = &[InputSpec {
    name: LATENT,
    kind: InputKind::Latent,
    optional: false,
}];

const BLEND_INPUTS: &[InputSpec] = &[
    InputSpec {
        name: LATENT_A,
        kind: InputKind::Latent,
        optional: false,
    },
    InputSpec {
        name: LATENT_B,
        kind: InputKind::Latent,
        optional: false,
    },
    InputSpec {
        name: "mask",
        kind: InputKind::Mask,
        optional: true,
    },
];

const CHANNEL: ParamSpec = ParamSpec::choice("channel", &ChannelSelector::OPTIONS, "all");
const KERNEL_SIZE: ParamSpec = ParamSpec::int("kernel_size", 3, 1, 21, 2);

const fn wide(name: &'static str, default: f64) -> ParamSpec {
    ParamSpec::float(name, default, -1000.0, 1000.0, 0.1)
}

const fn tone(name: &'static str, default: f64) -> ParamSpec {
    ParamSpec::float(name, default, -10.0, 10.0, 0.01)
}

const MULTIPLY: &[ParamSpec] = &[CHANNEL, wide("factor", 1.0)];
const ADD: &[ParamSpec] = &[CHANNEL, wide("amount", 0.0)];
const BLUR: &[ParamSpec] = &[CHANNEL, KERNEL_SIZE];
const SHARPEN: &[ParamSpec] = &[
    CHANNEL,
    ParamSpec::float("strength", 0.5, -10.0, 10.0, 0.1),
    KERNEL_SIZE,
];
const NOISE: &[ParamSpec] = &[
    CHANNEL,
    ParamSpec::float("strength", 0.1, 0.0, 100.0, 0.01),
    ParamSpec::int("seed", 0, 0, 0xFFFF_FFFF, 1),
];
const BLEND: &[ParamSpec] = &[
    ParamSpec::choice("mode", &BlendMode::OPTIONS, "normal"),
    ParamSpec::float("strength", 1.0, 0.0, 1.0, 0.01),
];
const WAVE: &[ParamSpec] = &[
    CHANNEL,
    ParamSpec::float("amplitude", 0.1, -1.0, 1.0, 0.01),
    ParamSpec::float("frequency", 5.0, 0.1, 100.0, 0.1),
    ParamSpec::float("phase", 0.0, 0.0, 6.283, 0.1),
    ParamSpec::choice("direction", &WaveDirection::OPTIONS, "horizontal"),
];
const CHANNEL_GAINS: &[ParamSpec] = &[
    wide("c0", 1.0),
    wide("c1", 1.0),
    wide("c2", 1.0),
    wide("c3", 1.0),
];
const CHANNEL_BIASES: &[ParamSpec] = &[
    wide("c0", 0.0),
    wide("c1", 0.0),
    wide("c2", 0.0),
    wide("c3", 0.0),
];
const MATRIX: &[ParamSpec] = &[
    wide("m00", 1.0),
    wide("m01", 0.0),
    wide("m02", 0.0),
    wide("m10", 0.0),
    wide("m11", 1.0),
    wide("m12", 0.0),
    wide("m20", 0.0),
    wide("m21", 0.0),
    wide("m22", 1.0),
];
const HUE: &[ParamSpec] = &[ParamSpec::float("angle_deg", 0.0, -360.0, 360.0, 1.0)];
const BRIGHTNESS: &[ParamSpec] = &[tone("amount", 0.0)];
const CONTRAST: &[ParamSpec] = &[ParamSpec::float("amount", 0.0, -1.0, 10.0, 0.01)];
const EXPOSURE: &[ParamSpec] = &[ParamSpec::float("factor", 1.0, 0.0, 10.0, 0.01)];
const GAMMA: &[ParamSpec] = &[ParamSpec::float("gamma", 1.0, 0.01, 10.0, 0.01)];
const CLAMP: &[ParamSpec] = &[wide("min_val", -1.0), wide("max_val", 1.0)];
const LEVELS: &[ParamSpec] = &[
    tone("in_black", -1.0),
    tone("in_white", 1.0),
    tone("out_black", -1.0),
    tone("out_white", 1.0),
];

fn multiply(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    ops::multiply(inputs.latent(LATENT)?, p.choice("channel")?, p.float("factor")?)
}

fn add(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    ops::add(inputs.latent(LATENT)?, p.choice("channel")?, p.float("amount")?)
}

fn blur(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    ops::blur(inputs.latent(LATENT)?, p.choice("channel")?, p.count("kernel_size")?)
}

fn sharpen(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    ops::sharpen(
        inputs.latent(LATENT)?,
        p.choice("channel")?,
        p.float("strength")?,
        p.count("kernel_size")?,
    )
}

fn gaussian_noise(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    ops::gaussian_noise(
        inputs.latent(LATENT)?,
        p.choice("channel")?,
        p.float("strength")?,
        p.count("seed")? as u64,
    )
}

fn blend(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    ops::blend(
        inputs.latent(LATENT_A)?,
        inputs.latent_b(LATENT_B)?,
        p.choice("mode")?,
        p.float("strength")?,
        inputs.mask,
    )
}

fn wave(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    let params = Wave {
        amplitude: p.float("amplitude")?,
        frequency: p.float("frequency")?,
        phase: p.float("phase")?,
        direction: p.choice("direction")?,
    };
    ops::wave(inputs.latent(LATENT)?, p.choice("channel")?, &params)
}

fn channels(p: &Resolved) -> Result<[f32; ops::CHANNEL_PARAMS]> {
    Ok([p.float("c0")?, p.float("c1")?, p.float("c2")?, p.float("c3")?])
}

fn channel_multiply(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    Ok(ops::channel_multiply(inputs.latent(LATENT)?, channels(p)?))
}

fn channel_add(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    Ok(ops::channel_add(inputs.latent(LATENT)?, channels(p)?))
}

fn channel_transform(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    let matrix = [
        [p.float("m00")?, p.float("m01")?, p.float("m02")?],
        [p.float("m10")?, p.float("m11")?, p.float("m12")?],
        [p.float("m20")?, p.float("m21")?, p.float("m22")?],
    ];
    Ok(ops::channel_transform(inputs.latent(LATENT)?, &matrix))
}

fn hue_shift(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    Ok(ops::hue_shift(inputs.latent(LATENT)?, p.float("angle_deg")?))
}

fn brightness(inputs: &NodeInputs<'_>, p: &Resolved, config: &FilterConfig) -> Result<Latent> {
    ops::brightness(inputs.latent(LATENT)?, p.float("amount")?, config)
}

fn contrast(inputs: &NodeInputs<'_>, p: &Resolved, config: &FilterConfig) -> Result<Latent> {
    ops::contrast(inputs.latent(LATENT)?, p.float("amount")?, config)
}

fn exposure(inputs: &NodeInputs<'_>, p: &Resolved, config: &FilterConfig) -> Result<Latent> {
    ops::exposure(inputs.latent(LATENT)?, p.float("factor")?, config)
}

fn gamma(inputs: &NodeInputs<'_>, p: &Resolved, config: &FilterConfig) -> Result<Latent> {
    ops::gamma(inputs.latent(LATENT)?, p.float("gamma")?, config)
}

fn invert(inputs: &NodeInputs<'_>, _: &Resolved, config: &FilterConfig) -> Result<Latent> {
    ops::invert(inputs.latent(LATENT)?, config)
}

fn clamp(inputs: &NodeInputs<'_>, p: &Resolved, _: &FilterConfig) -> Result<Latent> {
    ops::clamp(inputs.latent(LATENT)?, p.float("min_val")?, p.float("max_val")?)
}

fn levels(inputs: &NodeInputs<'_>, p: &Resolved, config: &FilterConfig) -> Result<Latent> {
    ops::levels(
        inputs.latent(LATENT)?,
        p.float("in_black")?,
        p.float("in_white")?,
        p.float("out_black")?,
        p.float("out_white")?,
        config,
    )
}

macro_rules! node {
    ($id:literal, $inputs:expr, $params:expr, $run:expr) => {
        BuiltinNode::new($id, $id, $inputs, $params, $run)
    };
}

/// Every built-in node, in menu order.
pub(super) fn all() -> Vec<BuiltinNode> {
    vec![
        node!("LT: Multiply", SINGLE_INPUT, MULTIPLY, multiply),
        node!("LT: Add", SINGLE_INPUT, ADD, add),
        node!("LT: Blur", SINGLE_INPUT, BLUR, blur),
        node!("LT: Sharpen", SINGLE_INPUT, SHARPEN, sharpen),
        node!("LT: Gaussian Noise", SINGLE_INPUT, NOISE, gaussian_noise),
        node!("LT: Blend", BLEND_INPUTS, BLEND, blend),
        node!("LT: Wave", SINGLE_INPUT, WAVE, wave),
        node!("LT: Channel Multiply", SINGLE_INPUT, CHANNEL_GAINS, channel_multiply),
        node!("LT: Channel Add", SINGLE_INPUT, CHANNEL_BIASES, channel_add),
        node!("LT: Channel Transform", SINGLE_INPUT, MATRIX, channel_transform),
        node!("LT: Hue Shift", SINGLE_INPUT, HUE, hue_shift),
        node!("LT: Brightness", SINGLE_INPUT, BRIGHTNESS, brightness),
        node!("LT: Contrast", SINGLE_INPUT, CONTRAST, contrast),
        node!("LT: Exposure", SINGLE_INPUT, EXPOSURE, exposure),
        node!("LT: Gamma", SINGLE_INPUT, GAMMA, gamma),
        node!("LT: Invert", SINGLE_INPUT, &[], invert),
        node!("LT: Clamp", SINGLE_INPUT, CLAMP, clamp),
        node!("LT: Levels", SINGLE_INPUT, LEVELS, levels),
    ]
}
