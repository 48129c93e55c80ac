use chrono::Local;
use tokio::sync::watch;

use crate::platform::Reading;

/// The four text blocks making up the screen.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayModel {
    pub status: String,
    pub coordinates: String,
    pub movement: String,
    pub last_update: String,
}

impl Default for DisplayModel {
    fn default() -> Self {
        Self {
            status: "Initializing...".to_string(),
            coordinates: "Waiting for location data...".to_string(),
            movement: "Movement data pending...".to_string(),
            last_update: "No updates yet".to_string(),
        }
    }
}

pub fn format_coordinates(reading: &Reading) -> String {
    format!(
        "COORDINATES\nLatitude: {:.6}\nLongitude: {:.6}\nAccuracy: {}m",
        reading.latitude,
        reading.longitude,
        reading.accuracy.round() as i32
    )
}

pub fn format_movement(reading: &Reading) -> String {
    let speed = match reading.speed {
        Some(mps) => format!("{:.1} km/h", mps * 3.6),
        None => "stationary".to_string(),
    };
    let bearing = match reading.bearing {
        Some(degrees) => format!("{}°", degrees.round() as i32),
        None => "unknown".to_string(),
    };
    let altitude = match reading.altitude {
        Some(meters) => format!("{}m", meters.round() as i64),
        None => "unknown".to_string(),
    };

    format!(
        "MOVEMENT\nSpeed: {}\nBearing: {}\nAltitude: {}",
        speed, bearing, altitude
    )
}

/// Wall-clock time of formatting, not the reading's own timestamp.
pub fn format_last_update() -> String {
    format!("Last update: {}", Local::now().format("%H:%M:%S"))
}

/// Redraw the terminal whenever the display model changes. Returns once the
/// controller hangs up.
pub async fn run_screen(mut display: watch::Receiver<DisplayModel>) -> anyhow::Result<()> {
    loop {
        {
            let model = display.borrow_and_update();
            render(&model);
        }

        if display.changed().await.is_err() {
            return Ok(());
        }
    }
}

fn render(model: &DisplayModel) {
    // Clear and home before repainting the four blocks.
    print!("\x1b[2J\x1b[H");
    println!("{}\n", model.status);
    println!("{}\n", model.coordinates);
    println!("{}\n", model.movement);
    println!("{}", model.last_update);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading() -> Reading {
        Reading {
            latitude: 37.42159265,
            longitude: -122.08400358,
            accuracy: 12.4,
            speed: Some(10.0),
            bearing: Some(271.6),
            altitude: Some(15.2),
            provider: "sim".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn coordinates_round_to_six_decimals() {
        let block = format_coordinates(&reading());
        assert!(block.contains("Latitude: 37.421593"));
        assert!(block.contains("Longitude: -122.084004"));
    }

    #[test]
    fn accuracy_rounds_to_whole_meters() {
        let mut sample = reading();
        sample.accuracy = 12.4;
        assert!(format_coordinates(&sample).contains("Accuracy: 12m"));

        sample.accuracy = 12.5;
        assert!(format_coordinates(&sample).contains("Accuracy: 13m"));
    }

    #[test]
    fn speed_converts_to_kmh() {
        let block = format_movement(&reading());
        assert!(block.contains("Speed: 36.0 km/h"));
    }

    #[test]
    fn bearing_and_altitude_round_to_integers() {
        let block = format_movement(&reading());
        assert!(block.contains("Bearing: 272°"));
        assert!(block.contains("Altitude: 15m"));
    }

    #[test]
    fn missing_movement_fields_fall_back_to_literals() {
        let mut sample = reading();
        sample.speed = None;
        sample.bearing = None;
        sample.altitude = None;

        let block = format_movement(&sample);
        assert!(block.contains("Speed: stationary"));
        assert!(block.contains("Bearing: unknown"));
        assert!(block.contains("Altitude: unknown"));
    }

    #[test]
    fn last_update_renders_wall_clock_time() {
        let block = format_last_update();
        let time = block.strip_prefix("Last update: ").unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(&time[2..3], ":");
        assert_eq!(&time[5..6], ":");
    }

    #[test]
    fn default_model_carries_the_initial_texts() {
        let model = DisplayModel::default();
        assert_eq!(model.status, "Initializing...");
        assert_eq!(model.last_update, "No updates yet");
    }
}
