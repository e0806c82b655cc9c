//! Evaluation of reconstruction algorithms against held-out samples.
//!
//! A [`TaskTable`] pairs test data with reconstructors and measures; running
//! it produces a [`ResultTable`] holding the measure values and, optionally,
//! the reconstructions themselves so that additional measures can be applied
//! later.

use ndarray::Array2;

use crate::Error;

/// An observation bundled with its ground truth for evaluation.
#[derive(Debug, Clone)]
pub struct TestData {
    /// The observation, possibly distorted or low-dimensional.
    pub observation: Array2<f32>,
    /// The reference against which reconstructions are scored. `None` if no
    /// ground-truth-based evaluation shall be performed.
    pub ground_truth: Option<Array2<f32>>,
    /// A short name identifying this sample in reports.
    pub name: String,
}

impl TestData {
    /// Bundles an observation with a ground truth.
    #[must_use]
    pub fn new(observation: Array2<f32>, ground_truth: Option<Array2<f32>>, name: &str) -> Self {
        Self {
            observation,
            ground_truth,
            name: name.to_string(),
        }
    }
}

/// A reconstruction algorithm: maps an observation to an image of the
/// ground truth's shape.
pub trait Reconstructor {
    /// A short name identifying the algorithm in reports.
    fn name(&self) -> &str {
        "reconstructor"
    }

    /// Reconstructs an image from an observation.
    fn reconstruct(&self, observation: &Array2<f32>) -> Array2<f32>;
}

/// A scalar measure comparing a reconstruction with a ground truth.
pub trait Measure {
    /// The short name by which the measure can be looked up.
    fn short_name(&self) -> &'static str;

    /// Calculates the value of this measure.
    fn apply(&self, reconstruction: &Array2<f32>, ground_truth: &Array2<f32>) -> f32;
}

/// The euclidean (l2) distance measure:
/// `sqrt(sum((reconstruction - ground_truth)^2))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct L2Measure;

impl Measure for L2Measure {
    fn short_name(&self) -> &'static str {
        "l2"
    }

    fn apply(&self, reconstruction: &Array2<f32>, ground_truth: &Array2<f32>) -> f32 {
        (reconstruction - ground_truth).mapv(|x| x * x).sum().sqrt()
    }
}

/// Returns a measure by its short name.
///
/// # Errors
///
/// * If no measure is registered under `name`.
pub fn measure_by_name(name: &str) -> Result<Box<dyn Measure>, Error> {
    match name.to_lowercase().as_str() {
        "l2" => Ok(Box::new(L2Measure)),
        _ => Err(Error::UnknownMeasure(name.to_string())),
    }
}

/// One reconstruction task: test data, an algorithm and the measures to
/// apply to its output.
pub struct Task<'a> {
    /// The sample to reconstruct from.
    pub test_data: TestData,
    /// The algorithm under evaluation.
    pub reconstructor: &'a dyn Reconstructor,
    /// The measures to compute for this task.
    pub measures: Vec<&'a dyn Measure>,
}

/// A table of reconstruction tasks to evaluate.
#[derive(Default)]
pub struct TaskTable<'a> {
    /// A name for reports.
    pub name: String,
    /// The tasks, in run order.
    pub tasks: Vec<Task<'a>>,
}

impl<'a> TaskTable<'a> {
    /// Creates an empty task table.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tasks: Vec::new(),
        }
    }

    /// Appends a task.
    pub fn append(&mut self, test_data: TestData, reconstructor: &'a dyn Reconstructor, measures: &[&'a dyn Measure]) {
        self.tasks.push(Task {
            test_data,
            reconstructor,
            measures: measures.to_vec(),
        });
    }

    /// Appends all combinations of the given test data and reconstructors
    /// as tasks.
    pub fn append_all_combinations(
        &mut self,
        test_data: &[TestData],
        reconstructors: &[&'a dyn Reconstructor],
        measures: &[&'a dyn Measure],
    ) {
        for data in test_data {
            for &reconstructor in reconstructors {
                self.append(data.clone(), reconstructor, measures);
            }
        }
    }

    /// Runs all tasks and returns the results.
    ///
    /// # Parameters
    ///
    /// - `save_reconstructions`: Whether the reconstructions are kept in
    ///   the results. Required if measures shall be applied after this
    ///   method returns.
    #[must_use]
    pub fn run(&self, save_reconstructions: bool) -> ResultTable {
        let mut results = ResultTable::default();
        for task in &self.tasks {
            let reconstruction = task.reconstructor.reconstruct(&task.test_data.observation);
            let values = task
                .test_data
                .ground_truth
                .as_ref()
                .map(|gt| {
                    task.measures
                        .iter()
                        .map(|measure| measure.apply(&reconstruction, gt))
                        .collect()
                })
                .unwrap_or_default();
            results.measure_values.push(values);
            results
                .reconstructions
                .push(save_reconstructions.then_some(reconstruction));
            results.ground_truths.push(task.test_data.ground_truth.clone());
            results.names.push(task.test_data.name.clone());
        }
        results
    }
}

/// The results of running a [`TaskTable`].
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    /// The reconstructions, if they were saved.
    pub reconstructions: Vec<Option<Array2<f32>>>,
    /// The ground truths of the corresponding tasks.
    pub ground_truths: Vec<Option<Array2<f32>>>,
    /// Per task, the values of its measures in task order.
    pub measure_values: Vec<Vec<f32>>,
    /// Per task, the name of its test data.
    pub names: Vec<String>,
}

impl ResultTable {
    /// The number of evaluated tasks.
    #[must_use]
    pub fn num_tasks(&self) -> usize {
        self.measure_values.len()
    }

    /// Applies additional measures to the stored reconstructions, appending
    /// their values to `measure_values`.
    ///
    /// Only possible if the reconstructions were saved when the table was
    /// run.
    ///
    /// # Errors
    ///
    /// * [`Error::MissingReconstruction`] if a task has no stored
    ///   reconstruction or no ground truth.
    pub fn apply_measures(&mut self, measures: &[&dyn Measure]) -> Result<(), Error> {
        for index in 0..self.num_tasks() {
            let reconstruction = self.reconstructions[index]
                .as_ref()
                .ok_or(Error::MissingReconstruction { index })?;
            let ground_truth = self.ground_truths[index]
                .as_ref()
                .ok_or(Error::MissingReconstruction { index })?;
            for measure in measures {
                self.measure_values[index].push(measure.apply(reconstruction, ground_truth));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use ndarray::{array, Array2};

    use super::{measure_by_name, L2Measure, Measure, Reconstructor, TaskTable, TestData};
    use crate::Error;

    /// Returns its observation unchanged.
    struct IdentityReconstructor;

    impl Reconstructor for IdentityReconstructor {
        fn name(&self) -> &str {
            "identity"
        }

        fn reconstruct(&self, observation: &Array2<f32>) -> Array2<f32> {
            observation.clone()
        }
    }

    #[test]
    fn l2_of_known_difference() {
        let reconstruction = array![[1.0_f32, 2.0], [3.0, 4.0]];
        let ground_truth = array![[1.0_f32, 2.0], [3.0, 1.0]];
        // Only one entry differs, by 3.
        assert!(approx_eq!(f32, L2Measure.apply(&reconstruction, &ground_truth), 3.0));
    }

    #[test]
    fn measure_lookup() -> Result<(), Error> {
        assert_eq!(measure_by_name("l2")?.short_name(), "l2");
        assert_eq!(measure_by_name("L2")?.short_name(), "l2");
        assert!(matches!(measure_by_name("ssim"), Err(Error::UnknownMeasure(_))));
        Ok(())
    }

    #[test]
    fn run_and_apply_measures() -> Result<(), Error> {
        let observation = array![[0.5_f32, 0.5], [0.5, 0.5]];
        let ground_truth = array![[0.5_f32, 0.5], [0.5, 1.5]];
        let reconstructor = IdentityReconstructor;
        let l2 = L2Measure;

        let mut table = TaskTable::new("test-table");
        table.append_all_combinations(
            &[TestData::new(observation, Some(ground_truth), "sample-0")],
            &[&reconstructor],
            &[&l2],
        );

        let mut results = table.run(true);
        assert_eq!(results.num_tasks(), 1);
        assert!(approx_eq!(f32, results.measure_values[0][0], 1.0));

        // Applying the same measure again appends a second value.
        results.apply_measures(&[&l2])?;
        assert_eq!(results.measure_values[0].len(), 2);
        assert!(approx_eq!(f32, results.measure_values[0][1], 1.0));

        Ok(())
    }

    #[test]
    fn apply_measures_requires_saved_reconstructions() {
        let observation = Array2::<f32>::zeros((2, 2));
        let ground_truth = Array2::<f32>::zeros((2, 2));
        let reconstructor = IdentityReconstructor;

        let mut table = TaskTable::new("test-table");
        table.append(TestData::new(observation, Some(ground_truth), "sample-0"), &reconstructor, &[]);

        let mut results = table.run(false);
        let err = results.apply_measures(&[&L2Measure]);
        assert!(matches!(err, Err(Error::MissingReconstruction { index: 0 })));
    }
}
