//! Resource descriptors and value types shared between the graph and the backends
//!
//! Every descriptor is an immutable, hashable value. Two requests with equal
//! descriptors are served from the same object pool.

use bitflags::bitflags;
use glam::{UVec2, Vec4};

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    Rg32Float,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    /// Format used for depth attachments the runtime synthesizes.
    pub const DEPTH_STENCIL: Self = TextureFormat::Depth24PlusStencil8;

    /// Format used for color attachments the runtime synthesizes.
    pub const RGBA: Self = TextureFormat::Rgba8Unorm;

    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24PlusStencil8)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rg8Unorm => 2,
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::R32Float
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float | TextureFormat::Rg32Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// Texture dimensionality of a [`TextureBufferDesc`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    #[default]
    Texture2D,
    CubeMap,
}

/// Cube map face, in upload order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeMapFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeMapFace {
    pub const ALL: [CubeMapFace; 6] = [
        CubeMapFace::PositiveX,
        CubeMapFace::NegativeX,
        CubeMapFace::PositiveY,
        CubeMapFace::NegativeY,
        CubeMapFace::PositiveZ,
        CubeMapFace::NegativeZ,
    ];

    pub fn index(&self) -> usize {
        match self {
            CubeMapFace::PositiveX => 0,
            CubeMapFace::NegativeX => 1,
            CubeMapFace::PositiveY => 2,
            CubeMapFace::NegativeY => 3,
            CubeMapFace::PositiveZ => 4,
            CubeMapFace::NegativeZ => 5,
        }
    }
}

/// Filter mode for sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Address mode for sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Shape of a 2D texture or cube map
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureBufferDesc {
    pub texture_type: TextureType,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub samples: u32,
    pub mip_levels: u32,
    pub filter: FilterMode,
    pub address_mode: AddressMode,
}

impl TextureBufferDesc {
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            texture_type: TextureType::Texture2D,
            width,
            height,
            format,
            samples: 1,
            mip_levels: 1,
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
        }
    }

    /// A cube map with square faces of `size` pixels.
    pub fn cube_map(size: u32, format: TextureFormat) -> Self {
        Self {
            texture_type: TextureType::CubeMap,
            ..Self::new(size, size, format)
        }
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_address_mode(mut self, address_mode: AddressMode) -> Self {
        self.address_mode = address_mode;
        self
    }

    /// Size in bytes of one face of the base mip level.
    pub fn face_size(&self) -> usize {
        (self.width * self.height * self.format.bytes_per_pixel()) as usize
    }

    pub fn face_count(&self) -> usize {
        match self.texture_type {
            TextureType::Texture2D => 1,
            TextureType::CubeMap => 6,
        }
    }
}

impl Default for TextureBufferDesc {
    /// A 1x1 RGBA placeholder texture.
    fn default() -> Self {
        Self::new(1, 1, TextureFormat::Rgba8Unorm)
    }
}

/// Shape of a layered 2D texture
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureArrayBufferDesc {
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub format: TextureFormat,
    pub samples: u32,
    pub mip_levels: u32,
    pub filter: FilterMode,
    pub address_mode: AddressMode,
}

impl TextureArrayBufferDesc {
    pub fn new(width: u32, height: u32, layers: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            layers,
            format,
            samples: 1,
            mip_levels: 1,
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
        }
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Size in bytes of one layer of the base mip level.
    pub fn layer_size(&self) -> usize {
        (self.width * self.height * self.format.bytes_per_pixel()) as usize
    }
}

/// Vertex buffer of `size` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferDesc {
    pub size: u64,
}

/// Index buffer of `size` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBufferDesc {
    pub size: u64,
}

/// Uniform buffer of `size` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderUniformBufferDesc {
    pub size: u64,
}

/// Storage buffer of `size` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderStorageBufferDesc {
    pub size: u64,
}

/// Shape of a framebuffer: its size and how many attachments it holds.
///
/// `layers` is 1 for plain textures and the layer count when the
/// attachments are texture arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub layers: u32,
    pub color_attachments: u32,
    pub has_depth_stencil: bool,
}

/// Attachment configuration a render pass is compatible with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPassDesc {
    pub color_attachments: u32,
    pub has_depth_stencil: bool,
    pub samples: u32,
}

impl From<&RenderTargetDesc> for RenderPassDesc {
    fn from(target: &RenderTargetDesc) -> Self {
        Self {
            color_attachments: target.color_attachments,
            has_depth_stencil: target.has_depth_stencil,
            samples: target.samples,
        }
    }
}

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Sint32,
}

impl VertexFormat {
    pub fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32 | VertexFormat::Uint32 | VertexFormat::Sint32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Layout of one interleaved vertex buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexBufferLayout {
    /// Build a tightly packed layout, assigning locations starting at `first_location`.
    pub fn packed(first_location: u32, formats: &[VertexFormat]) -> Self {
        let mut offset = 0;
        let attributes = formats
            .iter()
            .enumerate()
            .map(|(i, &format)| {
                let attribute = VertexAttribute {
                    location: first_location + i as u32,
                    format,
                    offset,
                };
                offset += format.size();
                attribute
            })
            .collect();

        Self {
            array_stride: offset,
            attributes,
        }
    }
}

/// Vertex binding configuration: per-vertex layout plus an optional per-instance layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexArrayObjectDesc {
    pub vertex_layout: VertexBufferLayout,
    pub instance_layout: Option<VertexBufferLayout>,
}

/// Index format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Cull mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Compare function for depth/stencil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Depth test state of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthTest {
    pub compare: CompareFunction,
    pub write_enabled: bool,
}

impl Default for DepthTest {
    fn default() -> Self {
        Self {
            compare: CompareFunction::Less,
            write_enabled: true,
        }
    }
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Blend component state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            operation: BlendOperation::Add,
        }
    }
}

/// Blend state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

impl BlendState {
    pub fn alpha_blending() -> Self {
        Self {
            color: BlendComponent {
                src_factor: BlendFactor::SrcAlpha,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
            alpha: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
        }
    }

    pub fn additive() -> Self {
        Self {
            color: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::One,
                operation: BlendOperation::Add,
            },
            alpha: BlendComponent::default(),
        }
    }
}

/// Shader program and fixed-function state.
///
/// Shader sources are opaque to the runtime and handed to the device as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RenderPipelineDesc {
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub geometry_shader: Option<String>,
    pub vertex_layout: VertexBufferLayout,
    pub instance_layout: Option<VertexBufferLayout>,
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub depth_test: Option<DepthTest>,
    pub blend: Option<BlendState>,
    pub multisample: bool,
}

impl RenderPipelineDesc {
    pub fn new(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            ..Default::default()
        }
    }

    pub fn with_vertex_layout(mut self, layout: VertexBufferLayout) -> Self {
        self.vertex_layout = layout;
        self
    }

    pub fn with_instance_layout(mut self, layout: VertexBufferLayout) -> Self {
        self.instance_layout = Some(layout);
        self
    }

    pub fn with_depth_test(mut self, depth_test: DepthTest) -> Self {
        self.depth_test = Some(depth_test);
        self
    }

    pub fn with_blend(mut self, blend: BlendState) -> Self {
        self.blend = Some(blend);
        self
    }
}

/// Any descriptor the runtime pools objects by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectDesc {
    VertexBuffer(VertexBufferDesc),
    IndexBuffer(IndexBufferDesc),
    TextureBuffer(TextureBufferDesc),
    TextureArrayBuffer(TextureArrayBufferDesc),
    ShaderUniformBuffer(ShaderUniformBufferDesc),
    ShaderStorageBuffer(ShaderStorageBufferDesc),
    RenderTarget(RenderTargetDesc),
    RenderPipeline(RenderPipelineDesc),
    RenderPass(RenderPassDesc),
    VertexArrayObject(VertexArrayObjectDesc),
}

bitflags! {
    /// How a shader accesses a bound resource.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderAccess: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl Default for ShaderAccess {
    fn default() -> Self {
        Self::READ
    }
}

/// Which attachment a blit copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlitKind {
    Color,
    Depth,
    Stencil,
}

/// Pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub offset: UVec2,
    pub size: UVec2,
}

impl Rect {
    pub fn new(offset: UVec2, size: UVec2) -> Self {
        Self { offset, size }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            offset: UVec2::ZERO,
            size: UVec2::new(width, height),
        }
    }
}

/// Viewport rectangle in pixels
pub type Viewport = Rect;

/// Attachment clear values; `None` leaves the attachment untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearValues {
    pub color: Option<Vec4>,
    pub depth: Option<f32>,
    pub stencil: Option<u32>,
}

/// CPU-side pixel data for texture uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

impl Image {
    pub fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// An image with every pixel set to `pixel`.
    pub fn filled(width: u32, height: u32, format: TextureFormat, pixel: &[u8]) -> Self {
        assert_eq!(
            pixel.len(),
            format.bytes_per_pixel() as usize,
            "pixel size does not match {format:?}"
        );
        let data = pixel.repeat((width * height) as usize);
        Self::new(width, height, format, data)
    }

    pub fn byte_size(&self) -> usize {
        (self.width * self.height * self.format.bytes_per_pixel()) as usize
    }
}
