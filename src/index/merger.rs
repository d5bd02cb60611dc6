use super::types::Run;

/// Accumulates runs and single insertions into a new canonical record body.
///
/// Input must arrive in body order. Adjacent runs with the same rank are
/// coalesced, so the finished body never has two neighbouring runs sharing a
/// rank. `counts[rank]` is the number of occurrences of each outgoing edge
/// merged so far, which is the rank of the next insertion of that edge.
#[derive(Debug, Clone)]
pub struct RunMerger {
    total_size: usize,
    accumulator: Run,
    runs: Vec<Run>,
    counts: Vec<usize>,
}

impl RunMerger {
    pub fn new(outdegree: usize) -> Self {
        Self {
            total_size: 0,
            accumulator: Run::default(),
            runs: Vec::new(),
            counts: vec![0; outdegree],
        }
    }

    /// Occurrences merged so far
    #[inline]
    pub fn size(&self) -> usize {
        self.total_size
    }

    /// Occurrences of outgoing edge `rank` merged so far
    #[inline]
    pub fn count(&self, rank: usize) -> usize {
        self.counts[rank]
    }

    /// Append an entire run
    pub fn insert_run(&mut self, run: Run) {
        self.total_size += run.len;
        self.counts[run.rank] += run.len;
        if run.rank == self.accumulator.rank {
            self.accumulator.len += run.len;
        } else {
            self.flush();
            self.accumulator = run;
        }
    }

    /// Append a single occurrence of outgoing edge `rank`
    #[inline]
    pub fn insert(&mut self, rank: usize) {
        self.insert_run(Run::new(rank, 1));
    }

    /// Register an outgoing edge just appended to the owning record
    pub fn add_edge(&mut self) {
        self.counts.push(0);
    }

    /// Finish merging. Returns the body and its total length.
    pub fn finish(mut self) -> (Vec<Run>, usize) {
        self.flush();
        (self.runs, self.total_size)
    }

    fn flush(&mut self) {
        if self.accumulator.len > 0 {
            self.runs.push(self.accumulator);
            self.accumulator.len = 0;
        }
    }
}
