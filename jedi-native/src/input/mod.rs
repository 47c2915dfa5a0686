pub mod camera_control;
pub mod selection;

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

//
// ──────────────────────────────────────────────────────────────
//   InputState
//
//   Accumulates window events between frames. Once per frame the
//   app takes a snapshot (current + previous), runs every consumer
//   against that one snapshot, then calls end_frame() to roll
//   current into previous.
// ──────────────────────────────────────────────────────────────
//

pub struct InputState
{
  keys: HashSet<KeyCode>,
  keys_last: HashSet<KeyCode>,
  buttons: HashSet<MouseButton>,
  buttons_last: HashSet<MouseButton>,

  cursor: Vec2,
  mouse_delta: Vec2,

  width: u32,
  height: u32,
  focused: bool,
}

/// One frame's view of the input, with the previous frame for edge detection.
#[derive(Clone, Debug, Default)]
pub struct InputSnapshot
{
  pub keyboard_current: HashSet<KeyCode>,
  pub keyboard_previous: HashSet<KeyCode>,
  pub mouse_current: HashSet<MouseButton>,
  pub mouse_previous: HashSet<MouseButton>,

  pub cursor: Vec2,
  /// Raw pointer motion since the last frame; keeps working while the cursor is grabbed.
  pub mouse_delta: Vec2,

  pub width: u32,
  pub height: u32,
}

impl InputState
{
  pub fn new(width: u32, height: u32) -> Self
  {
    Self {
      keys: HashSet::new(),
      keys_last: HashSet::new(),
      buttons: HashSet::new(),
      buttons_last: HashSet::new(),

      cursor: Vec2::ZERO,
      mouse_delta: Vec2::ZERO,

      width,
      height,
      focused: true,
    }
  }

  pub fn handle_event(&mut self, event: &WindowEvent)
  {
    match event
    {
      WindowEvent::CursorMoved { position, .. } =>
      {
        self.cursor = Vec2::new(position.x as f32, position.y as f32);
      }

      WindowEvent::MouseInput { state, button, .. } =>
      {
        set_held(&mut self.buttons, *button, *state == ElementState::Pressed);
      }

      WindowEvent::KeyboardInput { event, .. } =>
      {
        if let PhysicalKey::Code(code) = event.physical_key
        {
          set_held(&mut self.keys, code, event.state == ElementState::Pressed);
        }
      }

      WindowEvent::Resized(size) =>
      {
        self.width = size.width;
        self.height = size.height;
      }

      WindowEvent::Focused(focused) =>
      {
        self.focused = *focused;

        // Releases that happen while unfocused never reach us
        if !focused
        {
          self.keys.clear();
          self.buttons.clear();
        }
      }

      _ =>
      {}
    }
  }

  pub fn handle_device_event(&mut self, event: &DeviceEvent)
  {
    if !self.focused
    {
      return;
    }

    if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event
    {
      self.mouse_delta += Vec2::new(*dx as f32, *dy as f32);
    }
  }

  pub fn snapshot(&self) -> InputSnapshot
  {
    InputSnapshot {
      keyboard_current: self.keys.clone(),
      keyboard_previous: self.keys_last.clone(),
      mouse_current: self.buttons.clone(),
      mouse_previous: self.buttons_last.clone(),
      cursor: self.cursor,
      mouse_delta: self.mouse_delta,
      width: self.width,
      height: self.height,
    }
  }

  pub fn end_frame(&mut self)
  {
    self.keys_last.clone_from(&self.keys);
    self.buttons_last.clone_from(&self.buttons);
    self.mouse_delta = Vec2::ZERO;
  }

  /// For frames nobody consumed: drop motion but keep `previous`, so
  /// edges that happened meanwhile still show up on the next real frame.
  pub fn skip_frame(&mut self)
  {
    self.mouse_delta = Vec2::ZERO;
  }
}

fn set_held<T: std::hash::Hash + Eq>(set: &mut HashSet<T>, item: T, held: bool)
{
  if held
  {
    set.insert(item);
  }
  else
  {
    set.remove(&item);
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Edge queries
// ──────────────────────────────────────────────────────────────
//

impl InputSnapshot
{
  pub fn key_down(&self, key: KeyCode) -> bool
  {
    self.keyboard_current.contains(&key)
  }

  pub fn key_pressed(&self, key: KeyCode) -> bool
  {
    self.keyboard_current.contains(&key) && !self.keyboard_previous.contains(&key)
  }

  pub fn button_down(&self, button: MouseButton) -> bool
  {
    self.mouse_current.contains(&button)
  }

  pub fn button_pressed(&self, button: MouseButton) -> bool
  {
    self.mouse_current.contains(&button) && !self.mouse_previous.contains(&button)
  }

  pub fn button_released(&self, button: MouseButton) -> bool
  {
    !self.mouse_current.contains(&button) && self.mouse_previous.contains(&button)
  }
}
