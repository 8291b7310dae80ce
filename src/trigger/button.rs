//! Record button monitoring via evdev
//!
//! Watches every keyboard-like input device for the configured button
//! key. A press (value 1) fires a trigger; releases and key repeats are
//! ignored, so holding the button records exactly one clip.

use std::path::PathBuf;
use std::sync::Arc;

use evdev::{Device, InputEventKind, Key};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{DebounceState, Trigger};

/// Find all keyboard devices on the system
pub fn find_keyboards() -> Vec<(PathBuf, Device)> {
    evdev::enumerate()
        .filter_map(|(path, device)| {
            // A keyboard should support common keys
            let is_keyboard = device.supported_keys().map_or(false, |keys| {
                keys.contains(Key::KEY_ENTER)
                    && keys.contains(Key::KEY_SPACE)
                    && keys.contains(Key::KEY_A)
                    && keys.contains(Key::KEY_Z)
            });

            if is_keyboard {
                let name = device.name().unwrap_or("Unknown");
                log::info!("Found keyboard device: {:?} ({})", path, name);
                Some((path, device))
            } else {
                None
            }
        })
        .collect()
}

/// Check if we have permission to access input devices
fn check_permissions(keyboards: &[(PathBuf, Device)]) -> Result<(), String> {
    if keyboards.is_empty() {
        let all_devices: Vec<_> = evdev::enumerate().collect();

        if all_devices.is_empty() {
            return Err(
                "No input devices found. Ensure you are in the 'input' group:\n\
                 sudo usermod -aG input $USER\n\
                 Then log out and back in."
                    .to_string(),
            );
        } else {
            return Err(format!(
                "Found {} input devices but none appear to be keyboards. \
                 This might be a permissions issue or no keyboard is connected.",
                all_devices.len()
            ));
        }
    }

    Ok(())
}

/// Parse a key name from the config ("KEY_F12") into an evdev key code.
pub fn parse_button_key(name: &str) -> Result<Key, String> {
    name.parse::<Key>()
        .map_err(|_| format!("Unknown button key name: {}", name))
}

/// Manages record-button monitoring across all keyboard devices.
pub struct ButtonMonitor {
    cancel_token: CancellationToken,
    pub device_count: usize,
}

impl ButtonMonitor {
    /// Start monitoring. Spawns one task per keyboard device; each press
    /// of `button` (after debounce) sends `Trigger::Button` on `trigger_tx`.
    pub fn start(
        trigger_tx: mpsc::Sender<Trigger>,
        button: Key,
        debounce_ms: u64,
    ) -> Result<Self, String> {
        let keyboards = find_keyboards();
        check_permissions(&keyboards)?;

        let cancel_token = CancellationToken::new();
        let device_count = keyboards.len();

        log::info!(
            "Monitoring record button {:?} on {} device(s), debounce {}ms",
            button,
            device_count,
            debounce_ms
        );

        let debounce = Arc::new(DebounceState::new(debounce_ms));

        for (path, device) in keyboards {
            let tx = trigger_tx.clone();
            let cancel = cancel_token.clone();
            let debounce = debounce.clone();
            let path_str = path.to_string_lossy().to_string();

            tokio::spawn(async move {
                Self::monitor_device(path_str, device, button, tx, cancel, debounce).await;
            });
        }

        Ok(Self {
            cancel_token,
            device_count,
        })
    }

    /// Monitor a single device for presses of the record button.
    async fn monitor_device(
        path: String,
        device: Device,
        button: Key,
        tx: mpsc::Sender<Trigger>,
        cancel: CancellationToken,
        debounce: Arc<DebounceState>,
    ) {
        let name = device.name().unwrap_or("Unknown").to_string();
        log::info!("Monitoring device: {} ({})", path, name);

        let mut stream = match device.into_event_stream() {
            Ok(s) => s,
            Err(e) => {
                log::error!("Failed to create event stream for {}: {}", path, e);
                return;
            }
        };

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    log::info!("Button monitoring cancelled for {}", path);
                    break;
                }

                result = stream.next_event() => {
                    match result {
                        Ok(ev) => {
                            // Press only: release (0) and repeat (2) are ignored,
                            // so a held button fires once per press.
                            if ev.kind() == InputEventKind::Key(button)
                                && ev.value() == 1
                                && debounce.should_trigger()
                            {
                                log::info!("Record button pressed");
                                // A full channel means a cycle is in flight;
                                // the press is dropped, not queued.
                                if let Err(e) = tx.try_send(Trigger::Button) {
                                    log::debug!("Button trigger not observed: {}", e);
                                }
                            }
                        }
                        Err(e) => {
                            log::warn!("Device read error for {} (disconnected?): {}", path, e);
                            break;
                        }
                    }
                }
            }
        }

        log::info!("Stopped monitoring device: {}", path);
    }

    /// Stop all button monitoring
    pub fn stop(&self) {
        log::info!("Stopping button monitor");
        self.cancel_token.cancel();
    }
}

impl Drop for ButtonMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
