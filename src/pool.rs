use std::{
    num::NonZeroUsize,
    sync::atomic::{ AtomicUsize, Ordering },
};

use log::debug;
use rayon::{
    prelude::*,
    ThreadPool,
    ThreadPoolBuilder,
};

use crate::error::JoinError;

/// Bounded pool for the per-image stages. `None` uses all available cores.
pub fn build(jobs: Option<NonZeroUsize>) -> Result<ThreadPool, JoinError>{
    let threads = jobs.map(NonZeroUsize::get).unwrap_or(0);
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("photojoin-{i}"))
        .build()?;
    debug!("worker pool: {} threads", pool.current_num_threads());
    Ok(pool)
}

/// Runs `f` over `items` on the pool. Results come back in input order no
/// matter which worker finishes first. When items fail, the error of the
/// earliest one in input order is returned and items after it are skipped.
pub fn map_ordered<T, R, F>(pool: &ThreadPool, items: Vec<T>, f: F) -> Result<Vec<R>, JoinError>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R, JoinError> + Sync + Send,
{
    let n = items.len();
    let failed = AtomicUsize::new(usize::MAX);
    let slots: Vec<Option<Result<R, JoinError>>> = pool.install(|| {
        items
            .into_par_iter()
            .enumerate()
            .map(|(i, item)| {
                if i > failed.load(Ordering::Relaxed){
                    return None;
                }
                let res = f(item);
                if res.is_err(){
                    failed.fetch_min(i, Ordering::Relaxed);
                }
                Some(res)
            })
            .collect()
    });

    // a skipped slot always sits behind a recorded error, so the first
    // error is reached before any gap
    let mut out = Vec::with_capacity(n);
    for res in slots.into_iter().flatten(){
        out.push(res?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests{
    use super::*;
    use std::{ thread, time::Duration };

    #[test]
    fn results_follow_input_order(){
        let pool = build(NonZeroUsize::new(4)).unwrap();
        // earlier items sleep longer so they finish last
        let out = map_ordered(&pool, (0..8).collect(), |i: u64| {
            thread::sleep(Duration::from_millis((8 - i) * 3));
            Ok(i * 10)
        }).unwrap();
        assert_eq!(out, vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[test]
    fn failing_item_aborts(){
        let pool = build(NonZeroUsize::new(2)).unwrap();
        let out = map_ordered(&pool, vec![1, 0, 3], |i: u32| {
            if i == 0 { Err(JoinError::EmptyInput) } else { Ok(i) }
        });
        assert!(matches!(out, Err(JoinError::EmptyInput)));
    }

    #[test]
    fn earliest_failure_wins_over_faster_ones(){
        let pool = build(NonZeroUsize::new(4)).unwrap();
        // item 1 fails late, item 3 fails at once
        for _ in 0..5{
            let out = map_ordered(&pool, vec![0, 1, 2, 3], |i: u8| {
                match i{
                    1 => {
                        thread::sleep(Duration::from_millis(50));
                        Err(JoinError::InvalidQuality(1))
                    },
                    3 => Err(JoinError::InvalidQuality(3)),
                    _ => Ok(i),
                }
            });
            assert!(matches!(out, Err(JoinError::InvalidQuality(1))));
        }
    }

    #[test]
    fn pool_respects_job_count(){
        let pool = build(NonZeroUsize::new(3)).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }
}
