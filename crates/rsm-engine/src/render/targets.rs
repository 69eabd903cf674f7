use std::fmt;

/// Size of a render target in physical pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn texel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn aspect(self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Color attachment storage format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttachmentFormat {
    Rgba32Float,
    Rgba16Float,
    /// Whatever the presentation surface was configured with.
    Surface,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TargetKind {
    GBuffer,
    ReflectiveShadowMap,
    Accumulation,
    Surface,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetKind::GBuffer => "g-buffer",
            TargetKind::ReflectiveShadowMap => "reflective shadow map",
            TargetKind::Accumulation => "accumulation buffer",
            TargetKind::Surface => "surface",
        };
        f.write_str(s)
    }
}

/// Attachment set of a render target.
///
/// Programs declare the layout they write; passes refuse to pair a program with
/// a target of a different layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TargetLayout {
    pub kind: TargetKind,
    pub colors: &'static [AttachmentFormat],
    pub depth: bool,
}

impl TargetLayout {
    /// World position, normal + specular strength, albedo + shininess.
    pub const GBUFFER: Self = Self {
        kind: TargetKind::GBuffer,
        colors: &[
            AttachmentFormat::Rgba32Float,
            AttachmentFormat::Rgba16Float,
            AttachmentFormat::Rgba16Float,
        ],
        depth: true,
    };

    /// World position, normal, reflected flux.
    pub const RSM: Self = Self {
        kind: TargetKind::ReflectiveShadowMap,
        colors: &[
            AttachmentFormat::Rgba32Float,
            AttachmentFormat::Rgba16Float,
            AttachmentFormat::Rgba16Float,
        ],
        depth: true,
    };

    pub const ACCUMULATION: Self = Self {
        kind: TargetKind::Accumulation,
        colors: &[AttachmentFormat::Rgba16Float],
        depth: false,
    };

    pub const SURFACE: Self = Self {
        kind: TargetKind::Surface,
        colors: &[AttachmentFormat::Surface],
        depth: false,
    };

    pub fn color_count(&self) -> usize {
        self.colors.len()
    }
}

impl fmt::Display for TargetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} color", self.kind, self.colors.len())?;
        if self.colors.len() != 1 {
            f.write_str("s")?;
        }
        if self.depth {
            f.write_str(" + depth")?;
        }
        f.write_str(")")
    }
}

/// Index of each attachment inside the G-buffer and RSM layouts.
pub mod attachment {
    pub const POSITION: usize = 0;
    pub const NORMAL: usize = 1;
    pub const ALBEDO: usize = 2;
    pub const FLUX: usize = 2;
}

/// Device target together with the layout and size it was allocated with.
pub struct RenderTarget<T> {
    label: String,
    layout: TargetLayout,
    extent: Extent,
    raw: T,
}

impl<T> RenderTarget<T> {
    pub fn new(label: impl Into<String>, layout: TargetLayout, extent: Extent, raw: T) -> Self {
        Self {
            label: label.into(),
            layout,
            extent,
            raw,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> TargetLayout {
        self.layout
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn raw(&self) -> &T {
        &self.raw
    }
}

impl<T> fmt::Debug for RenderTarget<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTarget")
            .field("label", &self.label)
            .field("layout", &self.layout)
            .field("extent", &self.extent)
            .finish_non_exhaustive()
    }
}
