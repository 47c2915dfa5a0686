use std::path::{Path, PathBuf};

use crate::chart::Chart;
use crate::error::ChartError;

use super::depth::DEPTH_FORMAT;

//
// ──────────────────────────────────────────────────────────────
//   Drawable
//
//   Everything the frame loop draws. `prepare` runs before the
//   render pass opens and uploads whatever changed; `draw` only
//   records commands.
// ──────────────────────────────────────────────────────────────
//

pub trait Drawable
{
  fn name(&self) -> &str;

  fn prepare(&mut self, queue: &wgpu::Queue, chart: &Chart);

  fn draw(&self, pass: &mut wgpu::RenderPass<'_>);
}

//
// ──────────────────────────────────────────────────────────────
//   Shader assets
//
//   <exe dir>/assets/<name>/<name>.vert.wgsl
//   <exe dir>/assets/<name>/<name>.frag.wgsl
//
//   Files on disk win so shaders can be edited without a rebuild.
//   When a file is absent the copy compiled into the binary is used.
// ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage
{
  Vertex,
  Fragment,
}

impl ShaderStage
{
  fn extension(self) -> &'static str
  {
    match self
    {
      ShaderStage::Vertex => "vert.wgsl",
      ShaderStage::Fragment => "frag.wgsl",
    }
  }
}

pub fn asset_root() -> PathBuf
{
  std::env::current_exe()
    .ok()
    .and_then(|exe| exe.parent().map(Path::to_path_buf))
    .unwrap_or_default()
    .join("assets")
}

pub fn shader_path(root: &Path, name: &str, stage: ShaderStage) -> PathBuf
{
  root.join(name).join(format!("{name}.{}", stage.extension()))
}

fn embedded_shader(name: &str, stage: ShaderStage) -> Option<&'static str>
{
  match (name, stage)
  {
    ("axes", ShaderStage::Vertex) => Some(include_str!("../../assets/axes/axes.vert.wgsl")),
    ("axes", ShaderStage::Fragment) => Some(include_str!("../../assets/axes/axes.frag.wgsl")),
    ("cube", ShaderStage::Vertex) => Some(include_str!("../../assets/cube/cube.vert.wgsl")),
    ("cube", ShaderStage::Fragment) => Some(include_str!("../../assets/cube/cube.frag.wgsl")),
    _ => None,
  }
}

pub fn load_shader(root: &Path, name: &str, stage: ShaderStage) -> Result<String, ChartError>
{
  let path = shader_path(root, name, stage);

  match std::fs::read_to_string(&path)
  {
    Ok(source) =>
    {
      log::debug!("Shader {} loaded from disk", path.display());
      Ok(source)
    }

    Err(err) if err.kind() == std::io::ErrorKind::NotFound =>
    {
      embedded_shader(name, stage).map(str::to_owned).ok_or(ChartError::ShaderAsset { path, source: err })
    }

    Err(source) => Err(ChartError::ShaderAsset { path, source }),
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Pipeline builder
// ──────────────────────────────────────────────────────────────
//

pub struct PipelineDesc<'a>
{
  pub name: &'a str,
  pub topology: wgpu::PrimitiveTopology,
  pub vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
  pub bind_group_layout: &'a wgpu::BindGroupLayout,
  pub color_format: wgpu::TextureFormat,
}

/// Build a render pipeline from the named shader pair.
/// Validation failures come back as `ShaderCompile` with the driver's message.
pub fn create_pipeline(device: &wgpu::Device, desc: &PipelineDesc<'_>) -> Result<wgpu::RenderPipeline, ChartError>
{
  create_pipeline_from(device, &asset_root(), desc)
}

fn create_pipeline_from(
  device: &wgpu::Device,
  root: &Path,
  desc: &PipelineDesc<'_>,
) -> Result<wgpu::RenderPipeline, ChartError>
{
  let vert_src = load_shader(root, desc.name, ShaderStage::Vertex)?;
  let frag_src = load_shader(root, desc.name, ShaderStage::Fragment)?;

  device.push_error_scope(wgpu::ErrorFilter::Validation);

  let vert = device.create_shader_module(wgpu::ShaderModuleDescriptor {
    label: Some(&format!("{} Vertex Shader", desc.name)),
    source: wgpu::ShaderSource::Wgsl(vert_src.into()),
  });

  let frag = device.create_shader_module(wgpu::ShaderModuleDescriptor {
    label: Some(&format!("{} Fragment Shader", desc.name)),
    source: wgpu::ShaderSource::Wgsl(frag_src.into()),
  });

  let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
    label: Some(&format!("{} Pipeline Layout", desc.name)),
    bind_group_layouts: &[desc.bind_group_layout],
    push_constant_ranges: &[],
  });

  let strip_index_format = match desc.topology
  {
    wgpu::PrimitiveTopology::TriangleStrip | wgpu::PrimitiveTopology::LineStrip => Some(wgpu::IndexFormat::Uint16),
    _ => None,
  };

  let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
    label: Some(&format!("{} Pipeline", desc.name)),
    layout: Some(&layout),
    vertex: wgpu::VertexState {
      module: &vert,
      entry_point: Some("vs_main"),
      buffers: desc.vertex_buffers,
      compilation_options: wgpu::PipelineCompilationOptions::default(),
    },
    fragment: Some(wgpu::FragmentState {
      module: &frag,
      entry_point: Some("fs_main"),
      targets: &[Some(wgpu::ColorTargetState {
        format: desc.color_format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
      })],
      compilation_options: wgpu::PipelineCompilationOptions::default(),
    }),
    primitive: wgpu::PrimitiveState {
      topology: desc.topology,
      strip_index_format,
      front_face: wgpu::FrontFace::Ccw,
      cull_mode: None,
      unclipped_depth: false,
      polygon_mode: wgpu::PolygonMode::Fill,
      conservative: false,
    },
    depth_stencil: Some(wgpu::DepthStencilState {
      format: DEPTH_FORMAT,
      depth_write_enabled: true,
      depth_compare: wgpu::CompareFunction::Less,
      stencil: wgpu::StencilState::default(),
      bias: wgpu::DepthBiasState::default(),
    }),
    multisample: wgpu::MultisampleState::default(),
    multiview: None,
    cache: None,
  });

  if let Some(err) = pollster::block_on(device.pop_error_scope())
  {
    return Err(ChartError::ShaderCompile { name: desc.name.to_owned(), log: err.to_string() });
  }

  log::debug!("Pipeline '{}' built ({:?})", desc.name, desc.topology);
  Ok(pipeline)
}

//
// ──────────────────────────────────────────────────────────────
//   Uniform payload
//
//   Each pipeline owns one small uniform buffer in group 0,
//   rewritten in `prepare` every frame.
// ──────────────────────────────────────────────────────────────
//

pub struct UniformBinding
{
  pub buffer: wgpu::Buffer,
  pub layout: wgpu::BindGroupLayout,
  pub bind_group: wgpu::BindGroup,
}

impl UniformBinding
{
  pub fn create<T: bytemuck::Pod>(device: &wgpu::Device, name: &str) -> Self
  {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
      label: Some(&format!("{name} Uniform Buffer")),
      size: std::mem::size_of::<T>() as u64,
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
      mapped_at_creation: false,
    });

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      label: Some(&format!("{name} BGL")),
      entries: &[wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Buffer {
          ty: wgpu::BufferBindingType::Uniform,
          has_dynamic_offset: false,
          min_binding_size: None,
        },
        count: None,
      }],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      label: Some(&format!("{name} BG")),
      layout: &layout,
      entries: &[wgpu::BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
    });

    Self { buffer, layout, bind_group }
  }

  pub fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, value: &T)
  {
    queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
  }
}

#[cfg(test)]
mod tests
{
  use super::*;

  #[test]
  fn shader_paths_follow_name_convention()
  {
    let root = Path::new("/opt/jedi/assets");

    assert_eq!(shader_path(root, "cube", ShaderStage::Vertex), Path::new("/opt/jedi/assets/cube/cube.vert.wgsl"));
    assert_eq!(shader_path(root, "axes", ShaderStage::Fragment), Path::new("/opt/jedi/assets/axes/axes.frag.wgsl"));
  }

  #[test]
  fn missing_file_falls_back_to_builtin()
  {
    let root = Path::new("/nonexistent/assets");
    let source = load_shader(root, "axes", ShaderStage::Vertex).unwrap();

    assert!(source.contains("fn vs_main"));
  }

  #[test]
  fn unknown_shader_reports_path()
  {
    let root = Path::new("/nonexistent/assets");

    match load_shader(root, "candles", ShaderStage::Fragment)
    {
      Err(ChartError::ShaderAsset { path, .. }) => assert!(path.ends_with("candles/candles.frag.wgsl")),
      other => panic!("expected ShaderAsset, got {other:?}"),
    }
  }

  fn noop_device() -> (wgpu::Device, wgpu::Queue)
  {
    wgpu::Device::noop(&wgpu::DeviceDescriptor::default())
  }

  fn scratch_root(tag: &str) -> std::path::PathBuf
  {
    let root = std::env::temp_dir().join(format!("jedi-native-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    root
  }

  fn line_desc<'a>(name: &'a str, layout: &'a wgpu::BindGroupLayout) -> PipelineDesc<'a>
  {
    PipelineDesc {
      name,
      topology: wgpu::PrimitiveTopology::LineList,
      vertex_buffers: &[],
      bind_group_layout: layout,
      color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
    }
  }

  #[test]
  fn malformed_shader_on_disk_fails_with_compiler_message()
  {
    let (device, _queue) = noop_device();
    let uniform = UniformBinding::create::<[[f32; 4]; 4]>(&device, "broken");

    let root = scratch_root("malformed");
    let dir = root.join("broken");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("broken.vert.wgsl"), "this is not wgsl").unwrap();
    std::fs::write(dir.join("broken.frag.wgsl"), embedded_shader("axes", ShaderStage::Fragment).unwrap()).unwrap();

    let result = create_pipeline_from(&device, &root, &line_desc("broken", &uniform.layout));
    std::fs::remove_dir_all(&root).unwrap();

    match result
    {
      Err(ChartError::ShaderCompile { name, log }) =>
      {
        assert_eq!(name, "broken");
        assert!(log.contains("parsing error"), "{log}");
      }
      other => panic!("expected ShaderCompile, got {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn shader_on_disk_overrides_builtin()
  {
    let (device, _queue) = noop_device();
    let uniform = UniformBinding::create::<[[f32; 4]; 4]>(&device, "flat");

    let root = scratch_root("override");
    let dir = root.join("flat");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
      dir.join("flat.vert.wgsl"),
      "@vertex fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> { return vec4<f32>(f32(i), 0.0, 0.0, 1.0); }",
    )
    .unwrap();
    std::fs::write(dir.join("flat.frag.wgsl"), "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }")
      .unwrap();

    let result = create_pipeline_from(&device, &root, &line_desc("flat", &uniform.layout));
    std::fs::remove_dir_all(&root).unwrap();

    assert!(result.is_ok(), "{:?}", result.err());
  }

  #[test]
  fn builtin_pairs_have_entry_points()
  {
    for name in ["axes", "cube"]
    {
      assert!(embedded_shader(name, ShaderStage::Vertex).unwrap().contains("fn vs_main"));
      assert!(embedded_shader(name, ShaderStage::Fragment).unwrap().contains("fn fs_main"));
    }
  }
}
