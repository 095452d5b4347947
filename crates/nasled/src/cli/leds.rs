//! `leds` subcommand: list front-panel LEDs and their registers.

use super::{LedId, LedJson, LedsOutput, Result};

fn led_table() -> Vec<LedJson> {
    LedId::all()
        .map(|id| LedJson {
            id: id.raw(),
            name: id.name().to_string(),
            bay: id.disk_bay(),
            write_register: id.write_register(),
            status_register: id.status_register(),
        })
        .collect()
}

pub(super) fn cmd_leds(json: bool) -> Result<()> {
    let leds = led_table();

    if json {
        return super::print_json(&LedsOutput {
            count: leds.len(),
            leds,
        });
    }

    println!("  ID  Name     Write  Status");
    for led in &leds {
        println!(
            "  {:<3} {:<8} 0x{:02X}   0x{:02X}",
            led.id, led.name, led.write_register, led.status_register
        );
    }
    Ok(())
}
