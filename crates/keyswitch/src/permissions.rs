use std::process::Command;

use egui::{
    CentralPanel, Color32, Context, RichText, ViewportBuilder, ViewportCommand, ViewportId, vec2,
};
use tracing::warn;

/// System Settings deep link for the Accessibility pane.
const ACCESSIBILITY_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";
/// System Settings deep link for the Input Monitoring pane.
const INPUT_MONITORING_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_ListenEvent";

/// Window explaining which grants are missing, with links to System Settings.
pub struct PermissionsHelp {
    /// Whether the window is shown.
    visible: bool,
    /// Stable viewport id.
    id: ViewportId,
    /// The user closed the window; stay hidden until grants change again.
    dismissed: bool,
}

impl PermissionsHelp {
    /// Hidden help window.
    pub fn new() -> Self {
        Self {
            visible: false,
            id: ViewportId::from_hash_of("keyswitch_permissions"),
            dismissed: false,
        }
    }

    /// Show the window unless the user closed it.
    pub fn show(&mut self) {
        if !self.dismissed {
            self.visible = true;
        }
    }

    /// Hide the window and forget an earlier dismissal.
    pub fn hide(&mut self) {
        self.visible = false;
        self.dismissed = false;
    }

    /// Render the viewport when visible.
    pub fn render(&mut self, ctx: &Context) {
        if !self.visible {
            ctx.send_viewport_cmd_to(self.id, ViewportCommand::Visible(false));
            return;
        }

        let builder = ViewportBuilder::default()
            .with_title("keyswitch permissions")
            .with_visible(true)
            .with_decorations(true)
            .with_resizable(true)
            .with_inner_size(vec2(620.0, 400.0));

        ctx.show_viewport_immediate(self.id, builder, |wctx, _| {
            if wctx.input(|i| i.viewport().close_requested()) {
                self.visible = false;
                self.dismissed = true;
                wctx.send_viewport_cmd(ViewportCommand::Visible(false));
                return;
            }

            let status = ::permissions::check_permissions();
            CentralPanel::default().show(wctx, |ui| {
                ui.heading(RichText::new("keyswitch needs permissions").strong());
                ui.add_space(8.0);
                ui.label("Switching stays off until both permissions below are granted. keyswitch rechecks every few seconds; no restart is needed.");
                ui.add_space(12.0);
                ui.separator();

                let section = |ui: &mut egui::Ui, ok: bool, name: &str, help: &str, url: &str| {
                    ui.add_space(8.0);
                    let (color, label) = if ok {
                        (Color32::from_rgb(64, 201, 99), "Enabled")
                    } else {
                        (Color32::from_rgb(220, 50, 47), "Not enabled yet")
                    };
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(name).color(color).strong());
                        ui.add_space(6.0);
                        ui.label(RichText::new(label).color(color));
                    });
                    ui.label(help);
                    if ui.button(format!("Open {name} Settings")).clicked() {
                        open_settings(url);
                    }
                    ui.add_space(8.0);
                    ui.separator();
                };

                section(
                    ui,
                    status.accessibility_ok,
                    "Accessibility",
                    "Needed to find and raise other applications' windows.",
                    ACCESSIBILITY_URL,
                );
                section(
                    ui,
                    status.input_ok,
                    "Input Monitoring",
                    "Needed to see the trigger chord and shortcut keys.",
                    INPUT_MONITORING_URL,
                );
            });
        });
    }
}

/// Open a System Settings pane.
fn open_settings(url: &str) {
    if let Err(e) = Command::new("open").arg(url).spawn() {
        warn!(%url, error = %e, "open_settings_failed");
    }
}
