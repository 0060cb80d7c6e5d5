use std::time::{ Duration, Instant };

use log::debug;

/// Wall clock for the pipeline stages; every lap is logged at debug level.
pub struct Timer{
    start: Instant,
    last: Instant,
}

impl Timer{
    pub fn new() -> Self{
        let start = Instant::now();
        Self{ start, last: start }
    }

    pub fn since_lap(&self) -> Duration{
        self.last.elapsed()
    }

    pub fn total(&self) -> Duration{
        self.start.elapsed()
    }

    pub fn lap(&mut self, stage: &str) -> Duration{
        let took = self.since_lap();
        debug!("{stage}: {}ms", took.as_millis());
        self.last = Instant::now();
        took
    }
}
