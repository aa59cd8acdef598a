//! Output formatting for CLI responses

use anyhow::Error;
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use vrwheel_engine::Config;
use vrwheel_ffb::{FfbPacket, PacketKind};

use crate::commands::simulate::SimulationSummary;

pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "chain": error.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "Caused by:".yellow(), cause);
    }
}

/// Print `{"success": true, <key>: value}`.
pub fn print_success_json(key: &str, value: &impl Serialize) {
    let mut body = serde_json::Map::new();
    body.insert("success".to_string(), json!(true));
    match serde_json::to_value(value) {
        Ok(v) => {
            body.insert(key.to_string(), v);
        }
        Err(e) => {
            eprintln!("Failed to format {key} as JSON: {e}");
            return;
        }
    }
    match serde_json::to_string_pretty(&body) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format {key} as JSON: {e}"),
    }
}

pub fn print_config(config: &Config, json: bool) {
    if json {
        print_success_json("config", config);
        return;
    }

    let wheel = &config.wheel;
    println!("{}", "Wheel:".bold());
    println!(
        "  Center: ({:.3}, {:.3}, {:.3})",
        wheel.center.x, wheel.center.y, wheel.center.z
    );
    println!("  Size: {:.2} m", wheel.size);
    println!("  Rotation: {:.0}°", wheel.degrees);
    println!("  Pitch: {:.1}°", wheel.pitch);
    println!("  Center force: {:.2}", wheel.centerforce);
    println!("  Inertia: {:.3}", wheel.inertia);
    println!("  Opacity: {:.0}%", wheel.alpha);
    println!(
        "  Adaptive center: {}  Transparent center: {}",
        yes_no(wheel.adaptive_center),
        yes_no(wheel.transparent_center)
    );

    let shifter = &config.shifter;
    println!("{}", "Shifter:".bold());
    println!("  Reverse: {:?}", shifter.reverse_side);
    println!("  Sequential: {}", yes_no(shifter.sequential));
    println!("  Stick length: {:.0}%", shifter.geometry.scale);

    println!("{}", "Grab:".bold());
    println!(
        "  By grip: {}  Mode: {:?}  Anywhere: {}",
        yes_no(config.grab.by_grip),
        config.grab.grip_mode,
        yes_no(config.grab.grab_anywhere)
    );

    println!("{}", "Force feedback:".bold());
    println!("  Enabled: {}", yes_no(config.ffb.enabled));
    println!("  Smoothing: {:.2}", config.ffb.smoothing_alpha);

    println!("Tick rate: {} Hz", config.tick_rate_hz);
}

pub fn print_packets(packets: &[FfbPacket], json: bool) {
    if json {
        print_success_json("packets", &packets);
        return;
    }
    for (i, packet) in packets.iter().enumerate() {
        println!("{:>3} {} {}", i, kind_label(packet.kind()), describe(packet));
    }
}

pub fn print_simulation(summary: &SimulationSummary, json: bool) {
    if json {
        print_success_json("simulation", summary);
        return;
    }

    println!("{}", "Simulation complete".green().bold());
    println!("  Ticks: {} ({} stalled)", summary.ticks, summary.stalled);
    println!(
        "  Peak angle: {:.1}°  Final angle: {:.1}°",
        summary.peak_angle_degrees, summary.final_angle_degrees
    );
    println!("  Final axis: 0x{:04X}", summary.final_axis);
    match summary.final_gear {
        Some(button) => println!("  Gear button: {button}"),
        None => println!("  Gear button: {}", "neutral".dimmed()),
    }
    println!("  Haptic pulses: {}", summary.haptics);
    println!("  Sound cues: {}", summary.sounds);
    if summary.faults.is_empty() {
        println!("  Faults: {}", "none".green());
    } else {
        println!("  {}", "Faults:".yellow());
        for (fault, count) in &summary.faults {
            println!("    {fault}: {count}");
        }
    }
}

fn kind_label(kind: PacketKind) -> colored::ColoredString {
    let name = format!("{kind:?}");
    let label = format!("{name:<16}");
    match kind {
        PacketKind::ConstantForce => label.cyan(),
        PacketKind::EffectOperation => label.green(),
        PacketKind::DeviceControl => label.yellow(),
        PacketKind::Gain | PacketKind::EffectReport => label.normal(),
    }
}

fn describe(packet: &FfbPacket) -> String {
    match packet {
        FfbPacket::Gain(gain) => format!("gain={gain:.3}"),
        FfbPacket::EffectOperation {
            block_index,
            operation,
            loop_count,
        } => format!("block={block_index} op={operation:?} loops={loop_count}"),
        FfbPacket::EffectReport {
            block_index,
            parameters,
        } => format!(
            "block={} type={} duration={:?} gain={:.3} direction={:.1}°",
            block_index,
            parameters.effect_type,
            parameters.duration,
            parameters.gain,
            parameters.direction.degrees
        ),
        FfbPacket::ConstantForce {
            block_index,
            magnitude,
        } => format!("block={block_index} magnitude={magnitude:+.4}"),
        FfbPacket::DeviceControl(control) => format!("{control:?}"),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use vrwheel_ffb::{EffectOperation, FfbDirection};

    use super::*;

    #[test]
    fn test_describe_constant_force_is_signed() {
        let text = describe(&FfbPacket::ConstantForce {
            block_index: 2,
            magnitude: -0.25,
        });
        assert_eq!(text, "block=2 magnitude=-0.2500");
    }

    #[test]
    fn test_describe_effect_operation() {
        let text = describe(&FfbPacket::EffectOperation {
            block_index: 1,
            operation: EffectOperation::Start,
            loop_count: 3,
        });
        assert_eq!(text, "block=1 op=Start loops=3");
    }

    #[test]
    fn test_direction_is_printed_in_degrees() {
        let text = describe(&FfbPacket::EffectReport {
            block_index: 4,
            parameters: vrwheel_ffb::EffectParameters {
                effect_type: 1,
                duration: vrwheel_ffb::EffectDuration::Infinite,
                gain: 1.0,
                direction: FfbDirection::new(90.0),
            },
        });
        assert!(text.contains("direction=90.0°"));
    }
}
