//! Built-in tweak definitions.
//!
//! Pure data. Ids are stable and never reused; renaming a tweak means
//! keeping its id and changing only the display name.

use super::{Category, Mutation, ServiceChange, TweakDefinition};
use crate::control::ServiceRunState;
use crate::store::ConfigValue;

/// The high-performance power scheme identifier.
pub const HIGH_PERFORMANCE_SCHEME: &str = "8c5e7fda-e8bf-4a96-9a85-a6e23a8c635c";

pub(super) fn definitions() -> Vec<TweakDefinition> {
    vec![
        // === Gaming ===
        TweakDefinition {
            id: "gaming.game-dvr-off".to_string(),
            display_name: "Disable Game DVR".to_string(),
            description: "Turns off background game recording and capture overlays".to_string(),
            category: Category::Gaming,
            mutations: vec![
                Mutation::set(
                    "HKCU\\System\\GameConfigStore",
                    "GameDVR_Enabled",
                    ConfigValue::Int32(0),
                ),
                Mutation::set(
                    "HKLM\\SOFTWARE\\Policies\\Microsoft\\Windows\\GameDVR",
                    "AllowGameDVR",
                    ConfigValue::Int32(0),
                ),
            ],
            service_changes: Vec::new(),
            power_plan: None,
        },
        TweakDefinition {
            id: "gaming.gpu-scheduling".to_string(),
            display_name: "Hardware GPU scheduling".to_string(),
            description: "Enables hardware-accelerated GPU scheduling".to_string(),
            category: Category::Gaming,
            mutations: vec![Mutation::set(
                "HKLM\\SYSTEM\\CurrentControlSet\\Control\\GraphicsDrivers",
                "HwSchMode",
                ConfigValue::Int32(2),
            )],
            service_changes: Vec::new(),
            power_plan: None,
        },
        TweakDefinition {
            id: "gaming.responsiveness".to_string(),
            display_name: "Multimedia responsiveness".to_string(),
            description: "Removes the network throttling index and reserves no CPU for \
                          background multimedia tasks"
                .to_string(),
            category: Category::Gaming,
            mutations: vec![
                Mutation::set(
                    "HKLM\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile",
                    "NetworkThrottlingIndex",
                    ConfigValue::Int32(0x0FFF_FFFF),
                ),
                Mutation::set(
                    "HKLM\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile",
                    "SystemResponsiveness",
                    ConfigValue::Int32(0),
                ),
            ],
            service_changes: Vec::new(),
            power_plan: None,
        },
        // === Network ===
        TweakDefinition {
            id: "network.low-latency".to_string(),
            display_name: "Low-latency TCP".to_string(),
            description: "Disables delayed ACK and Nagle's algorithm on every network \
                          interface"
                .to_string(),
            category: Category::Network,
            mutations: vec![
                Mutation::for_each_child(
                    "HKLM\\SYSTEM\\CurrentControlSet\\Services\\Tcpip\\Parameters\\Interfaces",
                    "TcpAckFrequency",
                    ConfigValue::Int32(1),
                ),
                Mutation::for_each_child(
                    "HKLM\\SYSTEM\\CurrentControlSet\\Services\\Tcpip\\Parameters\\Interfaces",
                    "TCPNoDelay",
                    ConfigValue::Int32(1),
                ),
            ],
            service_changes: Vec::new(),
            power_plan: None,
        },
        // === Privacy ===
        TweakDefinition {
            id: "privacy.telemetry-off".to_string(),
            display_name: "Disable telemetry".to_string(),
            description: "Sets the telemetry level to off and stops the connected user \
                          experiences service"
                .to_string(),
            category: Category::Privacy,
            mutations: vec![Mutation::set(
                "HKLM\\SOFTWARE\\Policies\\Microsoft\\Windows\\DataCollection",
                "AllowTelemetry",
                ConfigValue::Int32(0),
            )],
            service_changes: vec![ServiceChange {
                service: "DiagTrack".to_string(),
                desired: ServiceRunState::Stopped,
            }],
            power_plan: None,
        },
        TweakDefinition {
            id: "privacy.advertising-id-off".to_string(),
            display_name: "Disable advertising ID".to_string(),
            description: "Stops apps from using the per-user advertising identifier".to_string(),
            category: Category::Privacy,
            mutations: vec![Mutation::set(
                "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\AdvertisingInfo",
                "Enabled",
                ConfigValue::Int32(0),
            )],
            service_changes: Vec::new(),
            power_plan: None,
        },
        // === Power ===
        TweakDefinition {
            id: "power.high-performance".to_string(),
            display_name: "High-performance power plan".to_string(),
            description: "Activates the high-performance power scheme".to_string(),
            category: Category::Power,
            mutations: Vec::new(),
            service_changes: Vec::new(),
            power_plan: Some(HIGH_PERFORMANCE_SCHEME.to_string()),
        },
        TweakDefinition {
            id: "power.hibernate-off".to_string(),
            display_name: "Disable hibernation".to_string(),
            description: "Turns off hibernation and removes the hiberfile".to_string(),
            category: Category::Power,
            mutations: vec![Mutation::set(
                "HKLM\\SYSTEM\\CurrentControlSet\\Control\\Power",
                "HibernateEnabled",
                ConfigValue::Int32(0),
            )],
            service_changes: Vec::new(),
            power_plan: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_namespaced_by_category() {
        for def in definitions() {
            assert!(
                def.id.starts_with(def.category.slot()),
                "tweak {} id does not match category {}",
                def.id,
                def.category
            );
        }
    }

    #[test]
    fn test_every_tweak_does_something() {
        for def in definitions() {
            assert!(
                !def.mutations.is_empty()
                    || !def.service_changes.is_empty()
                    || def.power_plan.is_some(),
                "tweak {} has no effect",
                def.id
            );
        }
    }
}
