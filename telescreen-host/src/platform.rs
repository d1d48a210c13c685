//! OS capture and injection capabilities.
//!
//! # Platform
//!
//! Windows-only. On other platforms the capabilities are defined but
//! return errors, which the handler logs (input) or which tear down the
//! requesting connection (screenshot).

use std::sync::Arc;

use telescreen_core::capability::{InputInjector, ScreenCapture};

use crate::config::CaptureConfig;

/// Build the platform screen-capture capability.
pub fn screen_capture(config: &CaptureConfig) -> Arc<dyn ScreenCapture> {
    Arc::new(platform::Capture::new(config))
}

/// Build the platform input-injection capability.
pub fn input_injector() -> Arc<dyn InputInjector> {
    Arc::new(platform::Injector)
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use std::io::Cursor;

    use telescreen_core::error::TsError;
    use telescreen_core::message::{ButtonState, KeyState, MouseButton};

    use windows::Win32::Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap,
        CreateCompatibleDC, DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits,
        ReleaseDC, SRCCOPY, SelectObject,
    };
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBD_EVENT_FLAGS, KEYBDINPUT,
        KEYEVENTF_KEYUP, MOUSE_EVENT_FLAGS, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL, MOUSEINPUT,
        SendInput, SetCursorPos, VIRTUAL_KEY, VkKeyScanW,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    use super::{CaptureConfig, InputInjector, ScreenCapture};

    /// GDI full-screen capture, encoded via the `image` crate.
    pub struct Capture {
        jpeg: bool,
        jpeg_quality: u8,
    }

    impl Capture {
        pub fn new(config: &CaptureConfig) -> Self {
            Self {
                jpeg: config.format.eq_ignore_ascii_case("jpeg"),
                jpeg_quality: config.jpeg_quality.clamp(1, 100),
            }
        }

        fn grab_bgra(&self) -> Result<(Vec<u8>, u32, u32), TsError> {
            unsafe {
                let width = GetSystemMetrics(SM_CXSCREEN);
                let height = GetSystemMetrics(SM_CYSCREEN);
                if width <= 0 || height <= 0 {
                    return Err(TsError::Capability("GetSystemMetrics returned 0".into()));
                }

                let screen_dc = GetDC(None);
                let mem_dc = CreateCompatibleDC(screen_dc);
                let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
                let old = SelectObject(mem_dc, bitmap);

                let blit = BitBlt(mem_dc, 0, 0, width, height, screen_dc, 0, 0, SRCCOPY);

                let mut info = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: width,
                        // Negative height → top-down rows.
                        biHeight: -height,
                        biPlanes: 1,
                        biBitCount: 32,
                        biCompression: BI_RGB.0,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
                let copied = GetDIBits(
                    mem_dc,
                    bitmap,
                    0,
                    height as u32,
                    Some(pixels.as_mut_ptr().cast()),
                    &mut info,
                    DIB_RGB_COLORS,
                );

                SelectObject(mem_dc, old);
                let _ = DeleteObject(bitmap);
                let _ = DeleteDC(mem_dc);
                ReleaseDC(None, screen_dc);

                if blit.is_err() || copied == 0 {
                    return Err(TsError::Capability("GDI screen grab failed".into()));
                }

                Ok((pixels, width as u32, height as u32))
            }
        }
    }

    impl ScreenCapture for Capture {
        fn capture(&self) -> Result<Vec<u8>, TsError> {
            let (mut pixels, width, height) = self.grab_bgra()?;

            // BGRA → RGBA in place.
            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
            }

            let img = image::RgbaImage::from_raw(width, height, pixels)
                .ok_or_else(|| TsError::Capability("pixel buffer size mismatch".into()))?;
            let img = image::DynamicImage::ImageRgba8(img);

            let mut buf = Cursor::new(Vec::new());
            if self.jpeg {
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut buf,
                    self.jpeg_quality,
                );
                img.to_rgb8().write_with_encoder(encoder)?;
            } else {
                img.write_to(&mut buf, image::ImageFormat::Png)?;
            }
            Ok(buf.into_inner())
        }
    }

    /// `SetCursorPos` + `SendInput` injection.
    pub struct Injector;

    impl Injector {
        fn send_mouse(&self, flags: MOUSE_EVENT_FLAGS, mouse_data: i32) -> Result<(), TsError> {
            let input = INPUT {
                r#type: INPUT_MOUSE,
                Anonymous: INPUT_0 {
                    mi: MOUSEINPUT {
                        dx: 0,
                        dy: 0,
                        mouseData: mouse_data as u32,
                        dwFlags: flags,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            };
            let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
            if sent == 0 {
                return Err(TsError::Capability("SendInput (mouse) returned 0".into()));
            }
            Ok(())
        }
    }

    impl InputInjector for Injector {
        fn move_cursor(&self, x: i32, y: i32) -> Result<(), TsError> {
            unsafe {
                SetCursorPos(x, y)
                    .map_err(|e| TsError::Capability(format!("SetCursorPos: {e}")))?;
            }
            Ok(())
        }

        fn button(
            &self,
            button: MouseButton,
            state: ButtonState,
            x: i32,
            y: i32,
        ) -> Result<(), TsError> {
            // Position the cursor first, then fire the button event.
            self.move_cursor(x, y)?;
            let flags = match (button, state) {
                (MouseButton::Left, ButtonState::Down) => MOUSEEVENTF_LEFTDOWN,
                (MouseButton::Left, ButtonState::Up) => MOUSEEVENTF_LEFTUP,
                (MouseButton::Right, ButtonState::Down) => MOUSEEVENTF_RIGHTDOWN,
                (MouseButton::Right, ButtonState::Up) => MOUSEEVENTF_RIGHTUP,
            };
            self.send_mouse(flags, 0)
        }

        fn key(&self, key: &str, state: KeyState) -> Result<(), TsError> {
            let vk = virtual_key(key)
                .ok_or_else(|| TsError::Capability(format!("unmapped key '{key}'")))?;

            let mut flags = KEYBD_EVENT_FLAGS(0);
            if state == KeyState::Up {
                flags |= KEYEVENTF_KEYUP;
            }

            let input = INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: VIRTUAL_KEY(vk),
                        wScan: 0,
                        dwFlags: flags,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            };
            let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
            if sent == 0 {
                return Err(TsError::Capability("SendInput (keyboard) returned 0".into()));
            }
            Ok(())
        }

        fn scroll(&self, delta: i32) -> Result<(), TsError> {
            self.send_mouse(MOUSEEVENTF_WHEEL, delta)
        }
    }

    /// Map a viewer key name to a Win32 virtual-key code.
    fn virtual_key(key: &str) -> Option<u16> {
        // Single printable characters go through the layout.
        let mut chars = key.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            let scan = unsafe { VkKeyScanW(c as u16) };
            if scan != -1 {
                return Some((scan & 0xFF) as u16);
            }
        }

        let vk: u16 = match key.to_ascii_lowercase().as_str() {
            "return" | "enter" => 0x0D,
            "escape" => 0x1B,
            "space" => 0x20,
            "tab" => 0x09,
            "backspace" => 0x08,
            "shift" | "shift_l" | "shift_r" => 0x10,
            "control" | "control_l" | "control_r" => 0x11,
            "alt" | "alt_l" | "alt_r" => 0x12,
            "caps_lock" => 0x14,
            "left" => 0x25,
            "up" => 0x26,
            "right" => 0x27,
            "down" => 0x28,
            "home" => 0x24,
            "end" => 0x23,
            "prior" => 0x21,
            "next" => 0x22,
            "insert" => 0x2D,
            "delete" => 0x2E,
            "f1" => 0x70,
            "f2" => 0x71,
            "f3" => 0x72,
            "f4" => 0x73,
            "f5" => 0x74,
            "f6" => 0x75,
            "f7" => 0x76,
            "f8" => 0x77,
            "f9" => 0x78,
            "f10" => 0x79,
            "f11" => 0x7A,
            "f12" => 0x7B,
            _ => return None,
        };
        Some(vk)
    }
}

// ── Non-Windows stubs ────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
mod platform {
    use telescreen_core::error::TsError;
    use telescreen_core::message::{ButtonState, KeyState, MouseButton};

    use super::{CaptureConfig, InputInjector, ScreenCapture};

    pub struct Capture;

    impl Capture {
        pub fn new(_config: &CaptureConfig) -> Self {
            Self
        }
    }

    impl ScreenCapture for Capture {
        fn capture(&self) -> Result<Vec<u8>, TsError> {
            Err(TsError::Capability(
                "screen capture is only available on Windows".into(),
            ))
        }
    }

    pub struct Injector;

    impl InputInjector for Injector {
        fn move_cursor(&self, _x: i32, _y: i32) -> Result<(), TsError> {
            Err(TsError::Capability(
                "input injection is only available on Windows".into(),
            ))
        }

        fn button(
            &self,
            _button: MouseButton,
            _state: ButtonState,
            _x: i32,
            _y: i32,
        ) -> Result<(), TsError> {
            Err(TsError::Capability(
                "input injection is only available on Windows".into(),
            ))
        }

        fn key(&self, _key: &str, _state: KeyState) -> Result<(), TsError> {
            Err(TsError::Capability(
                "input injection is only available on Windows".into(),
            ))
        }

        fn scroll(&self, _delta: i32) -> Result<(), TsError> {
            Err(TsError::Capability(
                "input injection is only available on Windows".into(),
            ))
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
