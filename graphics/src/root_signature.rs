//! Root signature layout.
//!
//! A [`RootSignature`] lists the root parameters a pipeline binds (inline
//! constants, root descriptors and descriptor tables) plus its static
//! samplers. [`RootSignature::finalize`] freezes the layout and records
//! which parameters are descriptor tables and how many descriptors each
//! table spans, which is what dynamic descriptor staging needs.

/// Maximum number of root parameters whose table sizes are tracked.
pub const MAX_ROOT_PARAMETERS: usize = 16;

/// Shader stages a root parameter is visible to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderVisibility {
    #[default]
    All,
    Vertex,
    Pixel,
    Compute,
}

/// Kind of descriptors in a table range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorRangeType {
    Srv,
    Uav,
    Cbv,
    Sampler,
}

/// Consecutive registers bound from a descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRange {
    pub range_type: DescriptorRangeType,
    pub base_register: u32,
    pub count: u32,
    pub space: u32,
}

/// One entry of a root signature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RootParameter {
    /// Not yet initialized.
    #[default]
    Unset,
    Constants {
        register: u32,
        num_dwords: u32,
        space: u32,
        visibility: ShaderVisibility,
    },
    ConstantBuffer {
        register: u32,
        space: u32,
        visibility: ShaderVisibility,
    },
    BufferSrv {
        register: u32,
        space: u32,
        visibility: ShaderVisibility,
    },
    BufferUav {
        register: u32,
        space: u32,
        visibility: ShaderVisibility,
    },
    DescriptorTable {
        ranges: Vec<DescriptorRange>,
        visibility: ShaderVisibility,
    },
}

impl RootParameter {
    pub fn constants(register: u32, num_dwords: u32, visibility: ShaderVisibility) -> Self {
        Self::Constants {
            register,
            num_dwords,
            space: 0,
            visibility,
        }
    }

    pub fn constant_buffer(register: u32, visibility: ShaderVisibility) -> Self {
        Self::ConstantBuffer {
            register,
            space: 0,
            visibility,
        }
    }

    pub fn buffer_srv(register: u32, visibility: ShaderVisibility) -> Self {
        Self::BufferSrv {
            register,
            space: 0,
            visibility,
        }
    }

    pub fn buffer_uav(register: u32, visibility: ShaderVisibility) -> Self {
        Self::BufferUav {
            register,
            space: 0,
            visibility,
        }
    }

    /// A table holding a single range.
    pub fn descriptor_range(
        range_type: DescriptorRangeType,
        register: u32,
        count: u32,
        visibility: ShaderVisibility,
    ) -> Self {
        Self::descriptor_table(
            vec![DescriptorRange {
                range_type,
                base_register: register,
                count,
                space: 0,
            }],
            visibility,
        )
    }

    pub fn descriptor_table(ranges: Vec<DescriptorRange>, visibility: ShaderVisibility) -> Self {
        Self::DescriptorTable { ranges, visibility }
    }

    /// Replace range `index` of a descriptor table.
    ///
    /// # Panics
    ///
    /// Panics if this is not a descriptor table or `index` is out of range.
    pub fn set_table_range(&mut self, index: usize, range: DescriptorRange) {
        match self {
            Self::DescriptorTable { ranges, .. } => {
                assert!(index < ranges.len(), "table range {index} out of {}", ranges.len());
                ranges[index] = range;
            }
            other => panic!("set_table_range on a non-table root parameter {other:?}"),
        }
    }

    /// Total descriptors spanned by a table, zero for other parameters.
    pub fn table_size(&self) -> u32 {
        match self {
            Self::DescriptorTable { ranges, .. } => ranges.iter().map(|range| range.count).sum(),
            _ => 0,
        }
    }

    fn is_sampler_table(&self) -> bool {
        matches!(self, Self::DescriptorTable { ranges, .. }
            if ranges.first().is_some_and(|range| range.range_type == DescriptorRangeType::Sampler))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
    Anisotropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    Wrap,
    Mirror,
    Clamp,
    Border,
}

/// Sampler state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub max_anisotropy: u32,
    pub border_color: [f32; 4],
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter: FilterMode::Anisotropic,
            address_u: AddressMode::Wrap,
            address_v: AddressMode::Wrap,
            address_w: AddressMode::Wrap,
            max_anisotropy: 16,
            border_color: [1.0; 4],
            min_lod: 0.0,
            max_lod: f32::MAX,
        }
    }
}

impl SamplerDesc {
    fn uses_border(&self) -> bool {
        [self.address_u, self.address_v, self.address_w].contains(&AddressMode::Border)
    }
}

/// Border colors a static sampler can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticBorderColor {
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

/// A sampler baked into the root signature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticSampler {
    pub register: u32,
    pub desc: SamplerDesc,
    pub border_color: StaticBorderColor,
    pub visibility: ShaderVisibility,
}

/// Layout of the resources bound to a pipeline.
#[derive(Debug, Clone, Default)]
pub struct RootSignature {
    parameters: Vec<RootParameter>,
    samplers: Vec<StaticSampler>,
    num_samplers: usize,
    finalized: bool,
    descriptor_table_bitmap: u32,
    sampler_table_bitmap: u32,
    descriptor_table_size: [u32; MAX_ROOT_PARAMETERS],
}

impl RootSignature {
    /// A layout with `num_parameters` unset parameters and room for
    /// `num_static_samplers` static samplers.
    pub fn new(num_parameters: usize, num_static_samplers: usize) -> Self {
        let mut signature = Self::default();
        signature.reset(num_parameters, num_static_samplers);
        signature
    }

    /// Discard every parameter and sampler.
    pub fn reset(&mut self, num_parameters: usize, num_static_samplers: usize) {
        self.parameters = vec![RootParameter::Unset; num_parameters];
        self.samplers = Vec::with_capacity(num_static_samplers);
        self.num_samplers = num_static_samplers;
        self.finalized = false;
        self.descriptor_table_bitmap = 0;
        self.sampler_table_bitmap = 0;
        self.descriptor_table_size = [0; MAX_ROOT_PARAMETERS];
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters.len()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn parameter(&self, index: usize) -> &RootParameter {
        assert!(
            index < self.parameters.len(),
            "root parameter {index} out of {}",
            self.parameters.len()
        );
        &self.parameters[index]
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range or the layout is finalized.
    pub fn parameter_mut(&mut self, index: usize) -> &mut RootParameter {
        assert!(!self.finalized, "root signature modified after finalize");
        assert!(
            index < self.parameters.len(),
            "root parameter {index} out of {}",
            self.parameters.len()
        );
        &mut self.parameters[index]
    }

    /// Add the next static sampler.
    ///
    /// Border addressing only supports transparent black, opaque black and
    /// opaque white; other border colors are snapped to the nearest of those.
    pub fn init_static_sampler(
        &mut self,
        register: u32,
        desc: SamplerDesc,
        visibility: ShaderVisibility,
    ) {
        assert!(
            self.samplers.len() < self.num_samplers,
            "static sampler {} exceeds the {} reserved",
            self.samplers.len(),
            self.num_samplers
        );

        let [r, g, b, a] = desc.border_color;
        let border_color = if a < 0.5 {
            StaticBorderColor::TransparentBlack
        } else if r + g + b < 1.5 {
            StaticBorderColor::OpaqueBlack
        } else {
            StaticBorderColor::OpaqueWhite
        };
        if desc.uses_border() {
            const EXACT: [[f32; 4]; 3] =
                [[0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]];
            if !EXACT.contains(&desc.border_color) {
                log::warn!(
                    "static sampler s{register}: border color {:?} snapped to {border_color:?}",
                    desc.border_color
                );
            }
        }

        self.samplers.push(StaticSampler {
            register,
            desc,
            border_color,
            visibility,
        });
    }

    pub fn static_samplers(&self) -> &[StaticSampler] {
        &self.samplers
    }

    /// Freeze the layout and compute the table bitmaps and sizes.
    ///
    /// Calling it again on a finalized layout does nothing.
    ///
    /// # Panics
    ///
    /// Panics if a parameter is unset, there are more than
    /// [`MAX_ROOT_PARAMETERS`] parameters, or not every reserved static
    /// sampler was initialized.
    pub fn finalize(&mut self, name: &str) {
        if self.finalized {
            return;
        }
        assert!(
            self.parameters.len() <= MAX_ROOT_PARAMETERS,
            "root signature '{name}' has {} parameters, the limit is {MAX_ROOT_PARAMETERS}",
            self.parameters.len()
        );
        assert_eq!(
            self.samplers.len(),
            self.num_samplers,
            "root signature '{name}' has uninitialized static samplers"
        );

        self.descriptor_table_bitmap = 0;
        self.sampler_table_bitmap = 0;
        for (index, parameter) in self.parameters.iter().enumerate() {
            assert!(
                *parameter != RootParameter::Unset,
                "root signature '{name}': parameter {index} was never initialized"
            );
            self.descriptor_table_size[index] = parameter.table_size();
            if let RootParameter::DescriptorTable { .. } = parameter {
                if parameter.is_sampler_table() {
                    self.sampler_table_bitmap |= 1 << index;
                } else {
                    self.descriptor_table_bitmap |= 1 << index;
                }
            }
        }

        self.finalized = true;
        log::debug!(
            "root signature '{}': {} parameters, {} static samplers",
            name,
            self.parameters.len(),
            self.samplers.len()
        );
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Bit `i` is set when parameter `i` is a CBV/SRV/UAV table.
    pub fn descriptor_table_bitmap(&self) -> u32 {
        self.descriptor_table_bitmap
    }

    /// Bit `i` is set when parameter `i` is a sampler table.
    pub fn sampler_table_bitmap(&self) -> u32 {
        self.sampler_table_bitmap
    }

    /// Descriptors spanned by the table at `index`, zero for other parameters.
    pub fn descriptor_table_size(&self, index: usize) -> u32 {
        self.descriptor_table_size[index]
    }
}

impl std::ops::Index<usize> for RootSignature {
    type Output = RootParameter;

    fn index(&self, index: usize) -> &RootParameter {
        self.parameter(index)
    }
}

impl std::ops::IndexMut<usize> for RootSignature {
    fn index_mut(&mut self, index: usize) -> &mut RootParameter {
        self.parameter_mut(index)
    }
}
