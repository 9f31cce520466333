// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Packed blend modes.

/// A multiplier applied to a blending operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendFactor {
    /// 0
    Zero = 0,
    /// 1
    One,
    /// Source color.
    SrcColor,
    /// 1 - source color.
    InvSrcColor,
    /// Source alpha.
    SrcAlpha,
    /// 1 - source alpha.
    InvSrcAlpha,
    /// Destination color.
    DstColor,
    /// 1 - destination color.
    InvDstColor,
    /// Destination alpha.
    DstAlpha,
    /// 1 - destination alpha.
    InvDstAlpha,
}

impl BlendFactor {
    const ALL: [BlendFactor; 10] = [
        Self::Zero,
        Self::One,
        Self::SrcColor,
        Self::InvSrcColor,
        Self::SrcAlpha,
        Self::InvSrcAlpha,
        Self::DstColor,
        Self::InvDstColor,
        Self::DstAlpha,
        Self::InvDstAlpha,
    ];

    fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }
}

/// The operation combining the weighted operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendOp {
    /// `src + dst`
    Add = 0,
    /// `src - dst`
    Sub,
    /// `dst - src`
    RevSub,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

impl BlendOp {
    const ALL: [BlendOp; 5] = [Self::Add, Self::Sub, Self::RevSub, Self::Min, Self::Max];

    fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }
}

/// The six fields of a [`BlendMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendComponent {
    /// Source color factor.
    SrcColor,
    /// Destination color factor.
    DstColor,
    /// Color operation.
    ColorOp,
    /// Source alpha factor.
    SrcAlpha,
    /// Destination alpha factor.
    DstAlpha,
    /// Alpha operation.
    AlphaOp,
}

impl BlendComponent {
    const fn shift(self) -> u32 {
        match self {
            BlendComponent::SrcColor => 0,
            BlendComponent::DstColor => 4,
            BlendComponent::ColorOp => 8,
            BlendComponent::SrcAlpha => 12,
            BlendComponent::DstAlpha => 16,
            BlendComponent::AlphaOp => 20,
        }
    }
}

/// A complete blend equation packed into 24 bits, four per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendMode(u32);

impl BlendMode {
    /// The number of bits a blend mode occupies.
    pub const BITS: u32 = 24;

    /// Blending disabled: the source replaces the destination.
    pub const NONE: Self = Self::compose(
        BlendFactor::One,
        BlendFactor::Zero,
        BlendOp::Add,
        BlendFactor::One,
        BlendFactor::Zero,
        BlendOp::Add,
    );

    /// Straight alpha blending.
    pub const ALPHA: Self = Self::compose(
        BlendFactor::SrcAlpha,
        BlendFactor::InvSrcAlpha,
        BlendOp::Add,
        BlendFactor::One,
        BlendFactor::InvSrcAlpha,
        BlendOp::Add,
    );

    /// Premultiplied alpha blending.
    pub const PREMUL_ALPHA: Self = Self::compose(
        BlendFactor::One,
        BlendFactor::InvSrcAlpha,
        BlendOp::Add,
        BlendFactor::One,
        BlendFactor::InvSrcAlpha,
        BlendOp::Add,
    );

    /// Additive blending.
    pub const ADD: Self = Self::compose(
        BlendFactor::SrcAlpha,
        BlendFactor::One,
        BlendOp::Add,
        BlendFactor::Zero,
        BlendFactor::One,
        BlendOp::Add,
    );

    /// Subtractive blending.
    pub const SUB: Self = Self::compose(
        BlendFactor::SrcAlpha,
        BlendFactor::One,
        BlendOp::RevSub,
        BlendFactor::Zero,
        BlendFactor::One,
        BlendOp::RevSub,
    );

    /// Multiplicative blending.
    pub const MOD: Self = Self::compose(
        BlendFactor::Zero,
        BlendFactor::SrcColor,
        BlendOp::Add,
        BlendFactor::Zero,
        BlendFactor::SrcAlpha,
        BlendOp::Add,
    );

    /// Packs a blend equation.
    pub const fn compose(
        src_color: BlendFactor,
        dst_color: BlendFactor,
        color_op: BlendOp,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
        alpha_op: BlendOp,
    ) -> Self {
        Self(
            (src_color as u32) << BlendComponent::SrcColor.shift()
                | (dst_color as u32) << BlendComponent::DstColor.shift()
                | (color_op as u32) << BlendComponent::ColorOp.shift()
                | (src_alpha as u32) << BlendComponent::SrcAlpha.shift()
                | (dst_alpha as u32) << BlendComponent::DstAlpha.shift()
                | (alpha_op as u32) << BlendComponent::AlphaOp.shift(),
        )
    }

    /// Packs a blend equation using the same factors and operation for color and alpha.
    pub const fn compose_simple(src: BlendFactor, dst: BlendFactor, op: BlendOp) -> Self {
        Self::compose(src, dst, op, src, dst, op)
    }

    /// Returns the packed bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Rebuilds a blend mode from packed bits, validating every component.
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits >> Self::BITS != 0 {
            return None;
        }

        let mode = Self(bits);
        BlendFactor::from_bits(mode.raw(BlendComponent::SrcColor))?;
        BlendFactor::from_bits(mode.raw(BlendComponent::DstColor))?;
        BlendOp::from_bits(mode.raw(BlendComponent::ColorOp))?;
        BlendFactor::from_bits(mode.raw(BlendComponent::SrcAlpha))?;
        BlendFactor::from_bits(mode.raw(BlendComponent::DstAlpha))?;
        BlendOp::from_bits(mode.raw(BlendComponent::AlphaOp))?;
        Some(mode)
    }

    fn raw(self, component: BlendComponent) -> u32 {
        (self.0 >> component.shift()) & 0xF
    }

    /// Returns one of the four factors. Panics if `component` names an operation.
    pub fn factor(self, component: BlendComponent) -> BlendFactor {
        assert!(!matches!(
            component,
            BlendComponent::ColorOp | BlendComponent::AlphaOp
        ));
        BlendFactor::from_bits(self.raw(component)).unwrap_or(BlendFactor::Zero)
    }

    /// Returns one of the two operations. Panics if `component` names a factor.
    pub fn op(self, component: BlendComponent) -> BlendOp {
        assert!(matches!(
            component,
            BlendComponent::ColorOp | BlendComponent::AlphaOp
        ));
        BlendOp::from_bits(self.raw(component)).unwrap_or(BlendOp::Add)
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::ALPHA
    }
}
