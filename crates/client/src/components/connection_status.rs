//! Connection status dot and offline banner.

use dioxus::prelude::*;

use crate::ws::{use_realtime_state, ConnectionStatus};

/// How a status is drawn in the compact indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusAppearance {
    pub color_class: &'static str,
    pub label: &'static str,
    /// Animate a pulse ring around the dot.
    pub pulse: bool,
}

impl StatusAppearance {
    pub fn for_status(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connected => Self {
                color_class: "bg-green-500",
                label: "Connected",
                pulse: false,
            },
            ConnectionStatus::Connecting => Self {
                color_class: "bg-yellow-500",
                label: "Connecting...",
                pulse: true,
            },
            ConnectionStatus::Disconnected => Self {
                color_class: "bg-red-500",
                label: "Disconnected",
                pulse: false,
            },
            ConnectionStatus::Reconnecting { .. } => Self {
                color_class: "bg-orange-500",
                label: "Reconnecting...",
                pulse: true,
            },
        }
    }
}

/// Full-width banner shown while the connection is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Banner {
    pub color_class: &'static str,
    pub text: &'static str,
    pub spinner: bool,
}

impl Banner {
    /// `None` while connected or connecting.
    pub fn for_status(status: ConnectionStatus) -> Option<Self> {
        match status {
            ConnectionStatus::Disconnected => Some(Self {
                color_class: "bg-red-500",
                text: "Connection lost. Check your internet connection.",
                spinner: false,
            }),
            ConnectionStatus::Reconnecting { .. } => Some(Self {
                color_class: "bg-orange-500",
                text: "Reconnecting to the server...",
                spinner: true,
            }),
            ConnectionStatus::Connecting | ConnectionStatus::Connected => None,
        }
    }
}

#[derive(Props, Clone, PartialEq)]
pub struct ConnectionIndicatorProps {
    #[props(optional)]
    pub show_label: Option<bool>,
    #[props(optional)]
    pub class: Option<String>,
}

#[component]
pub fn ConnectionIndicator(props: ConnectionIndicatorProps) -> Element {
    let state = use_realtime_state();
    let status = state.read().status;
    let look = StatusAppearance::for_status(status);
    let show_label = props.show_label.unwrap_or(false);
    let extra = props.class.unwrap_or_default();
    let color = look.color_class;

    rsx! {
        div {
            class: "flex items-center gap-2 {extra}",
            title: "{look.label}",
            div { class: "relative",
                div { class: "w-2.5 h-2.5 rounded-full {color}" }
                if look.pulse {
                    div { class: "absolute inset-0 rounded-full animate-ping opacity-70 {color}" }
                }
            }
            if show_label {
                span { class: "text-xs text-gray-500", "{look.label}" }
            }
        }
    }
}

#[component]
pub fn ConnectionBanner() -> Element {
    let state = use_realtime_state();
    let status = state.read().status;
    let Some(banner) = Banner::for_status(status) else {
        return rsx! {};
    };
    let color = banner.color_class;

    rsx! {
        div {
            class: "fixed top-0 left-0 right-0 z-50 py-2 px-4 text-center text-sm text-white {color}",
            div { class: "flex items-center justify-center gap-2",
                if banner.spinner {
                    div { class: "w-4 h-4 border-2 border-white border-t-transparent rounded-full animate-spin" }
                }
                span { "{banner.text}" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_only_when_down() {
        assert!(Banner::for_status(ConnectionStatus::Connected).is_none());
        assert!(Banner::for_status(ConnectionStatus::Connecting).is_none());

        let lost = Banner::for_status(ConnectionStatus::Disconnected).unwrap();
        let retry = Banner::for_status(ConnectionStatus::Reconnecting { attempt: 2 }).unwrap();
        assert_ne!(lost.color_class, retry.color_class);
        assert!(!lost.spinner);
        assert!(retry.spinner);
    }

    #[test]
    fn transitional_states_pulse() {
        assert!(StatusAppearance::for_status(ConnectionStatus::Connecting).pulse);
        assert!(StatusAppearance::for_status(ConnectionStatus::Reconnecting { attempt: 1 }).pulse);
        assert!(!StatusAppearance::for_status(ConnectionStatus::Connected).pulse);
        assert!(!StatusAppearance::for_status(ConnectionStatus::Disconnected).pulse);
    }
}
