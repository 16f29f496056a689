use super::IoError;
use crate::core::models::design::StateMetrics;
use crate::core::models::structure::Structure;
use std::io::{Read, Write};

/// Everything reported about one finished optimization run: search
/// parameters, counters, timings, the final sequence and its per-state
/// metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub jump: usize,
    pub exit: usize,
    pub mode: String,
    pub score: f64,
    pub num_mutations: u64,
    pub construction_time: f64,
    pub sample_time: f64,
    pub num_samples: u64,
    pub num_mfes: u64,
    pub num_eos: u64,
    pub num_objectives: u64,
    pub sequence: String,
    pub seq_length: usize,
    pub number_of_structures: usize,
    pub states: Vec<StateMetrics>,
}

const RUN_COLUMNS: [&str; 14] = [
    "jump",
    "exit",
    "mode",
    "score",
    "num_mutations",
    "construction_time",
    "sample_time",
    "num_samples",
    "num_mfes",
    "num_eos",
    "num_objectives",
    "sequence",
    "seq_length",
    "number_of_structures",
];

const STATE_COLUMNS: [&str; 8] = [
    "mfe_energy_",
    "mfe_structure_",
    "pf_energy_",
    "pf_structure_",
    "eos_",
    "diff_eos_mfe_",
    "mfe_reached_",
    "prob_",
];

/// Writes run records as semicolon-delimited CSV with a fixed column order:
/// run metadata first, then the eight metric columns per state.
pub struct CsvReporter<W: Write> {
    writer: csv::Writer<W>,
    wrote_header: bool,
}

impl<W: Write> CsvReporter<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(inner);
        Self {
            writer,
            wrote_header: false,
        }
    }

    fn write_header(&mut self, states: &[StateMetrics]) -> Result<(), IoError> {
        let mut header: Vec<String> = RUN_COLUMNS.iter().map(|s| s.to_string()).collect();
        for state in states {
            for column in STATE_COLUMNS {
                header.push(format!("{}{}", column, state.name));
            }
        }
        self.writer.write_record(&header)?;
        Ok(())
    }

    pub fn write_record(&mut self, record: &RunRecord) -> Result<(), IoError> {
        if !self.wrote_header {
            self.write_header(&record.states)?;
            self.wrote_header = true;
        }

        let mut row: Vec<String> = vec![
            record.jump.to_string(),
            record.exit.to_string(),
            record.mode.clone(),
            record.score.to_string(),
            record.num_mutations.to_string(),
            record.construction_time.to_string(),
            record.sample_time.to_string(),
            record.num_samples.to_string(),
            record.num_mfes.to_string(),
            record.num_eos.to_string(),
            record.num_objectives.to_string(),
            record.sequence.clone(),
            record.seq_length.to_string(),
            record.number_of_structures.to_string(),
        ];
        for state in &record.states {
            row.push(state.mfe_energy.to_string());
            row.push(state.mfe_structure.to_string());
            row.push(state.pf_energy.to_string());
            row.push(state.pf_structure.clone());
            row.push(state.eos.to_string());
            row.push(state.diff_eos_mfe.to_string());
            row.push(state.mfe_reached.to_string());
            row.push(state.probability.to_string());
        }
        self.writer.write_record(&row)?;
        self.writer.flush()?;
        Ok(())
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, name: &str) -> Result<T, IoError> {
    field
        .parse()
        .map_err(|_| IoError::InvalidInput(format!("unparsable {} field: '{}'", name, field)))
}

/// Reads back records written by [`CsvReporter`]. State names are recovered
/// from the header suffixes.
pub fn read_records<R: Read>(inner: R) -> Result<Vec<RunRecord>, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_reader(inner);

    let header = reader.headers()?.clone();
    if header.len() < RUN_COLUMNS.len()
        || (header.len() - RUN_COLUMNS.len()) % STATE_COLUMNS.len() != 0
    {
        return Err(IoError::InvalidInput(format!(
            "unexpected column count {}",
            header.len()
        )));
    }
    let state_names: Vec<String> = header
        .iter()
        .skip(RUN_COLUMNS.len())
        .step_by(STATE_COLUMNS.len())
        .map(|h| h.trim_start_matches("mfe_energy_").to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let field = |i: usize| row.get(i).unwrap_or_default();

        let mut states = Vec::with_capacity(state_names.len());
        for (s, name) in state_names.iter().enumerate() {
            let base = RUN_COLUMNS.len() + s * STATE_COLUMNS.len();
            states.push(StateMetrics {
                name: name.clone(),
                // The target structure is not a report column; carry the MFE
                // structure shape so the record is self-contained.
                structure: Structure::parse(field(base + 1))
                    .map_err(|e| IoError::InvalidInput(e.to_string()))?,
                mfe_energy: parse_field(field(base), "mfe_energy")?,
                mfe_structure: Structure::parse(field(base + 1))
                    .map_err(|e| IoError::InvalidInput(e.to_string()))?,
                pf_energy: parse_field(field(base + 2), "pf_energy")?,
                pf_structure: field(base + 3).to_string(),
                eos: parse_field(field(base + 4), "eos")?,
                diff_eos_mfe: parse_field(field(base + 5), "diff_eos_mfe")?,
                mfe_reached: parse_field(field(base + 6), "mfe_reached")?,
                probability: parse_field(field(base + 7), "prob")?,
            });
        }

        records.push(RunRecord {
            jump: parse_field(field(0), "jump")?,
            exit: parse_field(field(1), "exit")?,
            mode: field(2).to_string(),
            score: parse_field(field(3), "score")?,
            num_mutations: parse_field(field(4), "num_mutations")?,
            construction_time: parse_field(field(5), "construction_time")?,
            sample_time: parse_field(field(6), "sample_time")?,
            num_samples: parse_field(field(7), "num_samples")?,
            num_mfes: parse_field(field(8), "num_mfes")?,
            num_eos: parse_field(field(9), "num_eos")?,
            num_objectives: parse_field(field(10), "num_objectives")?,
            sequence: field(11).to_string(),
            seq_length: parse_field(field(12), "seq_length")?,
            number_of_structures: parse_field(field(13), "number_of_structures")?,
            states,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> RunRecord {
        let metrics = StateMetrics {
            name: "0".to_string(),
            structure: Structure::parse("((((....))))").unwrap(),
            mfe_energy: -15.0,
            mfe_structure: Structure::parse("((((....))))").unwrap(),
            pf_energy: -15.103582384,
            pf_structure: "||||....||||".to_string(),
            eos: -15.0,
            diff_eos_mfe: 0.0,
            mfe_reached: true,
            probability: 0.84521,
        };
        RunRecord {
            jump: 100,
            exit: 500,
            mode: "sample-global".to_string(),
            score: -42.375,
            num_mutations: 1234,
            construction_time: 0.0125,
            sample_time: 3.5,
            num_samples: 1300,
            num_mfes: 900,
            num_eos: 2700,
            num_objectives: 450,
            sequence: "GGGGAAAACCCC".to_string(),
            seq_length: 12,
            number_of_structures: 1,
            states: vec![metrics],
        }
    }

    #[test]
    fn header_carries_state_suffixed_columns() {
        let mut buffer = Vec::new();
        CsvReporter::new(&mut buffer)
            .write_record(&sample_record())
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("jump;exit;mode;score"));
        assert!(header.contains("mfe_energy_0"));
        assert!(header.contains("prob_0"));
    }

    #[test]
    fn numeric_fields_round_trip_exactly() {
        let record = sample_record();
        let mut buffer = Vec::new();
        CsvReporter::new(&mut buffer).write_record(&record).unwrap();

        let back = read_records(buffer.as_slice()).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].score, record.score);
        assert_eq!(back[0].states[0].pf_energy, record.states[0].pf_energy);
        assert_eq!(back[0].states[0].probability, record.states[0].probability);
        assert_eq!(back[0].states[0].mfe_reached, record.states[0].mfe_reached);
        assert_eq!(back[0].sequence, record.sequence);
    }

    #[test]
    fn multiple_records_share_one_header() {
        let mut buffer = Vec::new();
        let mut reporter = CsvReporter::new(&mut buffer);
        reporter.write_record(&sample_record()).unwrap();
        reporter.write_record(&sample_record()).unwrap();
        drop(reporter);

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(read_records(text.as_bytes()).unwrap().len(), 2);
    }
}
