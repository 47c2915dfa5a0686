use wgpu::util::DeviceExt;

use crate::camera::uniform::CubeUniform;
use crate::chart::Chart;
use crate::error::ChartError;

use super::pipeline::{self, Drawable, PipelineDesc, UniformBinding};

//
// ──────────────────────────────────────────────────────────────
//   Constants
// ──────────────────────────────────────────────────────────────
//

pub const MAX_CUBES_PER_CHART: usize = 1_000_000;

const DEBUG_COLOR: [f32; 3] = [1.0, 0.6, 0.1];

// 8 corners of the ±1 cube
const CORNERS: [[f32; 3]; 8] = [
  [1.0, 1.0, -1.0],   // 0
  [-1.0, 1.0, -1.0],  // 1
  [1.0, -1.0, -1.0],  // 2
  [-1.0, -1.0, -1.0], // 3
  [1.0, 1.0, 1.0],    // 4
  [-1.0, 1.0, 1.0],   // 5
  [-1.0, -1.0, 1.0],  // 6
  [1.0, -1.0, 1.0],   // 7
];

// All six faces as a single triangle strip
const STRIP: [u16; 14] = [3, 2, 6, 7, 4, 2, 0, 3, 1, 6, 5, 4, 1, 0];

//
// ──────────────────────────────────────────────────────────────
//   Per-instance layout: model (4 × vec4) + colour (vec3) + pad
// ──────────────────────────────────────────────────────────────
//

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CubeInstance
{
  pub model: [[f32; 4]; 4],
  pub color: [f32; 3],
  pub _pad: f32,
}

const _: () = assert!(std::mem::size_of::<CubeInstance>() == 80);

impl CubeInstance
{
  pub const DEBUG: Self = Self {
    model: [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0]],
    color: DEBUG_COLOR,
    _pad: 0.0,
  };

  const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    2 => Float32x4,  // model col 0
    3 => Float32x4,  // model col 1
    4 => Float32x4,  // model col 2
    5 => Float32x4,  // model col 3
    6 => Float32x3,  // colour
  ];

  fn layout() -> wgpu::VertexBufferLayout<'static>
  {
    wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<Self>() as u64,
      step_mode: wgpu::VertexStepMode::Instance,
      attributes: &Self::ATTRIBUTES,
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   CubeInstances
//
//   CPU mirror of the instance buffer. Capacity is fixed when the
//   chart is created; storage grows lazily up to it. Every
//   successful write bumps `revision` so the drawable knows to
//   upload.
// ──────────────────────────────────────────────────────────────
//

pub struct CubeInstances
{
  capacity: usize,
  data: Vec<CubeInstance>,
  count: usize,
  revision: u64,
}

impl CubeInstances
{
  pub fn new(capacity: usize) -> Self
  {
    Self { capacity: capacity.min(MAX_CUBES_PER_CHART), data: Vec::new(), count: 0, revision: 0 }
  }

  pub fn capacity(&self) -> usize
  {
    self.capacity
  }

  pub fn count(&self) -> usize
  {
    self.count
  }

  pub fn revision(&self) -> u64
  {
    self.revision
  }

  pub fn instances(&self) -> &[CubeInstance]
  {
    &self.data[..self.count]
  }

  /// Fill the first `n` slots with the identity transform and debug colour.
  pub fn write_cubes(&mut self, n: usize) -> Result<(), ChartError>
  {
    if n > self.capacity
    {
      return Err(ChartError::CapacityExceeded { requested: n, capacity: self.capacity });
    }

    if self.data.len() < n
    {
      self.data.resize(n, CubeInstance::DEBUG);
    }

    self.data[..n].fill(CubeInstance::DEBUG);
    self.count = n;
    self.revision += 1;

    Ok(())
  }
}

//
// ──────────────────────────────────────────────────────────────
//   CubePipeline
// ──────────────────────────────────────────────────────────────
//

pub struct CubePipeline
{
  pipeline: wgpu::RenderPipeline,
  uniform: UniformBinding,

  vertex_buffer: wgpu::Buffer,
  index_buffer: wgpu::Buffer,
  instance_buffer: wgpu::Buffer,

  capacity: usize,
  instance_count: u32,
  uploaded_revision: Option<u64>,
}

impl CubePipeline
{
  pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, capacity: usize) -> Result<Self, ChartError>
  {
    let capacity = capacity.min(MAX_CUBES_PER_CHART);
    let uniform = UniformBinding::create::<CubeUniform>(device, "Cube");

    let pipeline = pipeline::create_pipeline(
      device,
      &PipelineDesc {
        name: "cube",
        topology: wgpu::PrimitiveTopology::TriangleStrip,
        vertex_buffers: &[
          wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3],
          },
          CubeInstance::layout(),
        ],
        bind_group_layout: &uniform.layout,
        color_format,
      },
    )?;

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Cube Vertex Buffer"),
      contents: bytemuck::cast_slice(&CORNERS),
      usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Cube Index Buffer"),
      contents: bytemuck::cast_slice(&STRIP),
      usage: wgpu::BufferUsages::INDEX,
    });

    let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
      label: Some("Cube Instance Buffer"),
      size: (capacity.max(1) * std::mem::size_of::<CubeInstance>()) as u64,
      usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
      mapped_at_creation: false,
    });

    Ok(Self {
      pipeline,
      uniform,
      vertex_buffer,
      index_buffer,
      instance_buffer,
      capacity,
      instance_count: 0,
      uploaded_revision: None,
    })
  }
}

impl Drawable for CubePipeline
{
  fn name(&self) -> &str
  {
    "cube"
  }

  fn prepare(&mut self, queue: &wgpu::Queue, chart: &Chart)
  {
    self.uniform.write(queue, &CubeUniform::new(chart.view_proj(), chart.clip_space()));

    let cubes = chart.cubes();
    if self.uploaded_revision == Some(cubes.revision())
    {
      return;
    }

    // The chart enforces the same capacity; this only guards a mismatched config
    let instances = &cubes.instances()[..cubes.count().min(self.capacity)];
    if !instances.is_empty()
    {
      queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
    }

    self.instance_count = instances.len() as u32;
    self.uploaded_revision = Some(cubes.revision());
  }

  fn draw(&self, pass: &mut wgpu::RenderPass<'_>)
  {
    if self.instance_count == 0
    {
      return;
    }

    pass.set_pipeline(&self.pipeline);
    pass.set_bind_group(0, &self.uniform.bind_group, &[]);
    pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
    pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
    pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
    pass.draw_indexed(0..STRIP.len() as u32, 0, 0..self.instance_count);
  }
}

#[cfg(test)]
mod tests
{
  use super::*;
  use glam::Mat4;

  #[test]
  fn over_capacity_is_rejected_and_untouched()
  {
    let mut cubes = CubeInstances::new(MAX_CUBES_PER_CHART);
    cubes.write_cubes(3).unwrap();
    let revision = cubes.revision();

    let err = cubes.write_cubes(MAX_CUBES_PER_CHART + 1).unwrap_err();

    assert!(matches!(
      err,
      ChartError::CapacityExceeded { requested, capacity }
        if requested == MAX_CUBES_PER_CHART + 1 && capacity == MAX_CUBES_PER_CHART
    ));
    assert_eq!(cubes.count(), 3);
    assert_eq!(cubes.revision(), revision);
    assert_eq!(cubes.data.len(), 3);
  }

  #[test]
  fn exactly_capacity_is_accepted()
  {
    let mut cubes = CubeInstances::new(16);
    cubes.write_cubes(16).unwrap();

    assert_eq!(cubes.instances().len(), 16);
  }

  #[test]
  fn capacity_never_exceeds_maximum()
  {
    assert_eq!(CubeInstances::new(usize::MAX).capacity(), MAX_CUBES_PER_CHART);
  }

  #[test]
  fn written_slots_hold_identity_and_debug_colour()
  {
    let mut cubes = CubeInstances::new(8);
    cubes.write_cubes(5).unwrap();

    for cube in cubes.instances()
    {
      assert_eq!(Mat4::from_cols_array_2d(&cube.model), Mat4::IDENTITY);
      assert_eq!(cube.color, DEBUG_COLOR);
    }
  }

  #[test]
  fn shrinking_keeps_storage_and_bumps_revision()
  {
    let mut cubes = CubeInstances::new(8);
    cubes.write_cubes(6).unwrap();
    let first = cubes.revision();

    cubes.write_cubes(2).unwrap();

    assert_eq!(cubes.instances().len(), 2);
    assert_eq!(cubes.data.len(), 6);
    assert!(cubes.revision() > first);
  }

  #[test]
  fn strip_covers_all_corners()
  {
    let mut seen = [false; 8];
    for &i in &STRIP
    {
      seen[i as usize] = true;
    }

    assert!(seen.iter().all(|&s| s));
    assert_eq!(STRIP.len(), 14);
  }

  #[test]
  fn instance_attributes_fit_stride()
  {
    let last = CubeInstance::ATTRIBUTES[4];

    assert_eq!(CubeInstance::ATTRIBUTES[1].offset, 16);
    assert_eq!(last.offset, 64);
    assert!(last.offset + 12 <= std::mem::size_of::<CubeInstance>() as u64);
  }

  #[test]
  fn pipeline_builds_and_uploads_chart_instances()
  {
    let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
    let config = crate::config::Config { cube_capacity: 16, initial_cubes: 3, ..Default::default() };
    let mut chart = Chart::new("TEST", 800, 600, &config, crate::math::ClipSpace::WGPU).unwrap();

    let mut cubes = CubePipeline::new(&device, wgpu::TextureFormat::Bgra8UnormSrgb, 16).unwrap();
    assert_eq!(cubes.instance_count, 0);

    cubes.prepare(&queue, &chart);
    assert_eq!(cubes.instance_count, 3);
    assert_eq!(cubes.uploaded_revision, Some(chart.cubes().revision()));

    chart.write_cubes(16).unwrap();
    cubes.prepare(&queue, &chart);
    assert_eq!(cubes.instance_count, 16);
  }
}
