use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::camera::uniform::AxesUniform;
use crate::chart::Chart;
use crate::error::ChartError;

use super::pipeline::{self, Drawable, PipelineDesc, UniformBinding};

//
// ──────────────────────────────────────────────────────────────
//   Constants
// ──────────────────────────────────────────────────────────────
//

pub const AXIS_LENGTH: f32 = 10.0;

const COL_X: [f32; 3] = [1.0, 0.0, 0.0];
const COL_Y: [f32; 3] = [0.0, 1.0, 0.0];
const COL_Z: [f32; 3] = [0.0, 0.0, 1.0];
const COL_SELECTION: [f32; 3] = [1.0, 1.0, 1.0];

const AXIS_VERTS: usize = 6;
const OUTLINE_VERTS: usize = 8;
pub const VERTEX_COUNT: usize = AXIS_VERTS + OUTLINE_VERTS;

/// Display space → world. Display X/Y are chart X and mirrored chart Y;
/// rotating half a turn about Z lands them on the world ground plane.
pub const DISPLAY_TO_WORLD: Mat4 = Mat4::from_cols(
  Vec4::new(-1.0, 0.0, 0.0, 0.0),
  Vec4::new(0.0, -1.0, 0.0, 0.0),
  Vec4::new(0.0, 0.0, 1.0, 0.0),
  Vec4::new(0.0, 0.0, 0.0, 1.0),
);

//
// ──────────────────────────────────────────────────────────────
//   Vertex layout: [x, y, z,  r, g, b]
// ──────────────────────────────────────────────────────────────
//

type Vertex = [f32; 6];

const VERTEX_SIZE: u64 = std::mem::size_of::<Vertex>() as u64;

fn make_vertex(pos: [f32; 3], col: [f32; 3]) -> Vertex
{
  [pos[0], pos[1], pos[2], col[0], col[1], col[2]]
}

//
// ──────────────────────────────────────────────────────────────
//   AxesGeometry
//
//   Three fixed axis lines followed by the selection outline.
//   Only the outline range ever changes.
// ──────────────────────────────────────────────────────────────
//

pub struct AxesGeometry
{
  vertices: [Vertex; VERTEX_COUNT],
  revision: u64,
}

impl AxesGeometry
{
  pub fn new() -> Self
  {
    let origin = [0.0_f32, 0.0, 0.0];
    let outline = make_vertex(origin, COL_SELECTION);

    Self {
      vertices: [
        make_vertex(origin, COL_X),
        make_vertex([AXIS_LENGTH, 0.0, 0.0], COL_X),
        make_vertex(origin, COL_Y),
        make_vertex([0.0, -AXIS_LENGTH, 0.0], COL_Y),
        make_vertex(origin, COL_Z),
        make_vertex([0.0, 0.0, AXIS_LENGTH], COL_Z),
        outline,
        outline,
        outline,
        outline,
        outline,
        outline,
        outline,
        outline,
      ],
      revision: 0,
    }
  }

  pub fn vertices(&self) -> &[Vertex; VERTEX_COUNT]
  {
    &self.vertices
  }

  pub fn outline(&self) -> &[Vertex]
  {
    &self.vertices[AXIS_VERTS..]
  }

  pub fn revision(&self) -> u64
  {
    self.revision
  }

  /// Replace the outline vertices. Returns whether anything changed.
  pub fn set_outline(&mut self, points: &[Vec3; OUTLINE_VERTS]) -> bool
  {
    let mut changed = false;

    for (slot, p) in self.vertices[AXIS_VERTS..].iter_mut().zip(points)
    {
      let vertex = make_vertex(p.to_array(), COL_SELECTION);
      if *slot != vertex
      {
        *slot = vertex;
        changed = true;
      }
    }

    if changed
    {
      self.revision += 1;
    }

    changed
  }
}

impl Default for AxesGeometry
{
  fn default() -> Self
  {
    Self::new()
  }
}

//
// ──────────────────────────────────────────────────────────────
//   AxesPipeline
// ──────────────────────────────────────────────────────────────
//

pub struct AxesPipeline
{
  pipeline: wgpu::RenderPipeline,
  uniform: UniformBinding,
  vertex_buffer: wgpu::Buffer,
  uploaded_revision: u64,
}

impl AxesPipeline
{
  pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, geometry: &AxesGeometry) -> Result<Self, ChartError>
  {
    let uniform = UniformBinding::create::<AxesUniform>(device, "Axes");

    let pipeline = pipeline::create_pipeline(
      device,
      &PipelineDesc {
        name: "axes",
        topology: wgpu::PrimitiveTopology::LineList,
        vertex_buffers: &[wgpu::VertexBufferLayout {
          array_stride: VERTEX_SIZE,
          step_mode: wgpu::VertexStepMode::Vertex,
          attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,  // position
            1 => Float32x3,  // colour
          ],
        }],
        bind_group_layout: &uniform.layout,
        color_format,
      },
    )?;

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Axes Vertex Buffer"),
      contents: bytemuck::cast_slice(geometry.vertices()),
      usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });

    Ok(Self { pipeline, uniform, vertex_buffer, uploaded_revision: geometry.revision() })
  }
}

impl Drawable for AxesPipeline
{
  fn name(&self) -> &str
  {
    "axes"
  }

  fn prepare(&mut self, queue: &wgpu::Queue, chart: &Chart)
  {
    self.uniform.write(queue, &AxesUniform::new(chart.camera(), DISPLAY_TO_WORLD, chart.clip_space()));

    let axes = chart.axes();
    if axes.revision() != self.uploaded_revision
    {
      queue.write_buffer(&self.vertex_buffer, AXIS_VERTS as u64 * VERTEX_SIZE, bytemuck::cast_slice(axes.outline()));
      self.uploaded_revision = axes.revision();
    }
  }

  fn draw(&self, pass: &mut wgpu::RenderPass<'_>)
  {
    pass.set_pipeline(&self.pipeline);
    pass.set_bind_group(0, &self.uniform.bind_group, &[]);
    pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
    pass.draw(0..VERTEX_COUNT as u32, 0..1);
  }
}

#[cfg(test)]
mod tests
{
  use super::*;
  use crate::input::selection::outline_vertices;
  use glam::Vec2;

  #[test]
  fn fresh_geometry_has_collapsed_outline()
  {
    let axes = AxesGeometry::new();

    assert_eq!(axes.vertices().len(), 14);
    assert!(axes.outline().iter().all(|v| v[..3] == [0.0, 0.0, 0.0]));
  }

  #[test]
  fn outline_update_leaves_axes_alone()
  {
    let mut axes = AxesGeometry::new();
    let before: Vec<Vertex> = axes.vertices()[..AXIS_VERTS].to_vec();

    assert!(axes.set_outline(&outline_vertices(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0))));

    assert_eq!(&axes.vertices()[..AXIS_VERTS], before.as_slice());
    assert_eq!(axes.revision(), 1);
    assert_eq!(axes.outline()[0][..3], [1.0, -2.0, 0.0]);
  }

  #[test]
  fn identical_outline_does_not_bump_revision()
  {
    let mut axes = AxesGeometry::new();
    let outline = outline_vertices(Vec2::new(-1.0, 0.5), Vec2::new(2.0, 3.0));

    axes.set_outline(&outline);
    assert!(!axes.set_outline(&outline));
    assert_eq!(axes.revision(), 1);
  }

  #[test]
  fn display_space_lands_on_chart_point()
  {
    // Chart (cx, cy) is world (-cx, cy); display is (cx, -cy)
    let chart = Vec2::new(3.5, -1.25);
    let display = Vec3::new(chart.x, -chart.y, 0.0);

    let world = DISPLAY_TO_WORLD.transform_point3(display);

    assert_eq!(world, Vec3::new(-chart.x, chart.y, 0.0));
  }

  #[test]
  fn display_axes_point_along_positive_chart_axes()
  {
    let axes = AxesGeometry::new();
    let x_end = Vec3::from_slice(&axes.vertices()[1][..3]);
    let y_end = Vec3::from_slice(&axes.vertices()[3][..3]);

    // Back to chart coordinates: (-wx, wy)
    let x_world = DISPLAY_TO_WORLD.transform_point3(x_end);
    let y_world = DISPLAY_TO_WORLD.transform_point3(y_end);

    assert_eq!(Vec2::new(-x_world.x, x_world.y), Vec2::new(AXIS_LENGTH, 0.0));
    assert_eq!(Vec2::new(-y_world.x, y_world.y), Vec2::new(0.0, AXIS_LENGTH));
  }

  #[test]
  fn pipeline_builds_and_tracks_outline_revision()
  {
    let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
    let chart = Chart::new("TEST", 800, 600, &crate::config::Config::default(), crate::math::ClipSpace::WGPU).unwrap();

    let mut axes = AxesPipeline::new(&device, wgpu::TextureFormat::Bgra8UnormSrgb, chart.axes()).unwrap();
    assert_eq!(axes.uploaded_revision, chart.axes().revision());

    axes.prepare(&queue, &chart);
    assert_eq!(axes.uploaded_revision, chart.axes().revision());
  }
}
