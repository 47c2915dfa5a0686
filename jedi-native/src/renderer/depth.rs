use wgpu::*;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Depth attachment sized to the surface. Recreated on every resize.
pub struct DepthResources
{
  pub view: TextureView,
  texture: Texture,
}

impl DepthResources
{
  pub fn create(device: &Device, config: &SurfaceConfiguration) -> Self
  {
    let texture = device.create_texture(&TextureDescriptor {
      label: Some("Depth Texture"),
      size: Extent3d { width: config.width.max(1), height: config.height.max(1), depth_or_array_layers: 1 },
      mip_level_count: 1,
      sample_count: 1,
      dimension: TextureDimension::D2,
      format: DEPTH_FORMAT,
      usage: TextureUsages::RENDER_ATTACHMENT,
      view_formats: &[],
    });

    let view = texture.create_view(&TextureViewDescriptor::default());

    Self { view, texture }
  }

  pub fn destroy(self)
  {
    drop(self.view);
    self.texture.destroy();
  }
}
