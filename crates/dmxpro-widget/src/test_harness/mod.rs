// Test harness module
// Seeded host-traffic simulation against the processor

pub mod simulator;

pub use simulator::*;

/// Test harness for running multi-seed certification runs
pub struct TestHarness;

impl TestHarness {
    /// Run the simulator once per seed in `0..seeds`.
    ///
    /// Every run uses `base` with only `seed` and `total_operations`
    /// replaced, so the widget shape (universe size, serial number, chunking)
    /// is the one configured by the caller.
    #[must_use]
    pub fn run_certification(base: &SimulatorConfig, seeds: u64, operations: u64) -> CertificationReport {
        tracing::info!(
            seeds,
            operations,
            max_channels = base.max_channels,
            "running certification simulation"
        );

        let mut all_passed = true;
        let mut total_violations = 0;
        let mut total_operations = 0;

        for seed in 0..seeds {
            let config = SimulatorConfig {
                seed,
                total_operations: operations,
                ..base.clone()
            };

            let report = run_simulator(config);
            if !report.passed() {
                tracing::warn!(seed, violations = report.violations.len(), "seed failed");
                all_passed = false;
            }
            total_violations += report.violations.len();
            total_operations += report.stats.operations;
        }

        CertificationReport {
            passed: all_passed && total_violations == 0,
            total_violations,
            total_operations,
            seeds_tested: seeds,
            max_channels: base.max_channels,
            serial_number: base.serial_number,
        }
    }
}

/// Report from certification
#[derive(Debug, Clone)]
pub struct CertificationReport {
    pub passed: bool,
    pub total_violations: usize,
    pub total_operations: u64,
    pub seeds_tested: u64,
    /// Universe size every run was certified with
    pub max_channels: u16,
    /// Serial number every run was certified with
    pub serial_number: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certification_uses_base_config() {
        let base = SimulatorConfig {
            max_channels: 3,
            serial_number: 0xDEAD_BEEF,
            seed: 999,
            ..Default::default()
        };
        let report = TestHarness::run_certification(&base, 3, 200);

        assert!(report.passed);
        assert_eq!(report.max_channels, 3);
        assert_eq!(report.serial_number, 0xDEAD_BEEF);
        assert_eq!(report.seeds_tested, 3);
        assert_eq!(report.total_operations, 600);
    }
}
