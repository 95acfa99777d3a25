use std::path::PathBuf;

/// Acquisition constants matching the analyser's defaults.
const SAMPLING_FREQUENCY: f64 = 10_000.0;
const MAX_REVOLUTIONS_PER_SECOND: f64 = 50.0;
/// Workpiece length in m.
const WORKPIECE_LENGTH: f64 = 0.1;
const SAMPLES: usize = 12_000;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One simulated cut.
struct Cut {
    speed: u32,
    angle: u32,
    moisture: u32,
    repetition: u32,
    species: &'static str,
    /// Nominal thickness in tenths of a millimetre, as encoded in the name.
    nominal: u32,
    /// Thickness actually removed, in mm.
    real: f64,
    feed_force: f64,
}

impl Cut {
    fn filename(&self) -> String {
        format!(
            "V{:02}_A{:02}_M{:02}_R{:02}_{}_hss_CH{:02}.txt",
            self.speed, self.angle, self.moisture, self.repetition, self.species, self.nominal
        )
    }

    /// Rows of `x, y, z, distance`. The force burst starts at a third of the
    /// recording and lasts as long as the workpiece takes to pass the tool;
    /// the distance sensor sees the surface once per revolution and drops by
    /// the real thickness once the tool engages.
    fn rows(&self, rng: &mut SimpleRng) -> Vec<[f64; 4]> {
        let rotation = ((1.0 / MAX_REVOLUTIONS_PER_SECOND)
            * (100.0 / f64::from(self.speed))
            * SAMPLING_FREQUENCY)
            .round() as usize;
        let spacing = rotation + rotation / 20;
        let pulse = rotation / 12;
        let engage = SAMPLES / 3;
        let pass = (WORKPIECE_LENGTH * SAMPLING_FREQUENCY / f64::from(self.speed)) as usize;
        let release = engage + pass;
        let surface = 2.0;

        (0..SAMPLES)
            .map(|i| {
                let cutting = (engage..release).contains(&i);
                let force = if cutting {
                    rng.gauss(self.feed_force, 0.05 * self.feed_force)
                } else {
                    rng.gauss(0.0, 0.2)
                };
                let in_pulse = i % spacing < pulse;
                let distance = match (in_pulse, i >= engage) {
                    (true, false) => surface + rng.gauss(0.0, 0.002),
                    (true, true) => surface - self.real + rng.gauss(0.0, 0.002),
                    (false, _) => rng.gauss(0.0, 0.002),
                };
                // Bias on every channel, removed by the offset stage.
                [
                    0.3 * force + 0.5,
                    force + 1.0,
                    -0.4 * force - 0.7,
                    -distance,
                ]
            })
            .collect()
    }
}

fn main() {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&out_dir).expect("Failed to create output directory");

    let mut rng = SimpleRng::new(42);
    let mut written = 0;

    for (speed, feed_force) in [(30, 45.0), (50, 60.0)] {
        for angle in [0, 45, 90] {
            for repetition in 1..=2 {
                let nominal = 3;
                let cut = Cut {
                    speed,
                    angle,
                    moisture: 12,
                    repetition,
                    species: "spruce",
                    nominal,
                    real: f64::from(nominal) / 10.0 + rng.gauss(0.0, 0.02),
                    feed_force: feed_force * (1.0 + f64::from(angle) / 180.0),
                };

                let path = out_dir.join(cut.filename());
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_path(&path)
                    .expect("Failed to create recording");
                for row in cut.rows(&mut rng) {
                    writer
                        .serialize(row.map(|v| format!("{v:.5}")))
                        .expect("Failed to write row");
                }
                writer.flush().expect("Failed to flush recording");
                written += 1;
            }
        }
    }

    println!(
        "Wrote {written} recordings ({SAMPLES} samples each) to {}",
        out_dir.display()
    );
}
