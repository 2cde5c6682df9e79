use std::{ptr::NonNull, sync::{self, atomic}, thread};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serial_test::serial;

use hdralloc::{Flags, HdrAllocator, HEADER_SIZE};

static HDR_ALLOCATOR: HdrAllocator = HdrAllocator::new();

//
//  Tests
//

#[serial]
#[test]
fn allocate_deallocate_cycles() {
    //  Test that blocks can be concurrently allocated and deallocated, and that the peak is never under-reported.
    //
    //  1.  Each thread allocates a batch of blocks of random sizes, and adds their size to the iteration's tally.
    //  2.  All threads hold their batch simultaneously, synchronized by a barrier, and sample the statistics.
    //  3.  Each thread frees its batch.
    //
    //  The largest tally of any iteration is a lower bound of the peak, which must be reflected by the tracker.

    let number_iterations = number_iterations();
    let number_threads = number_threads();
    let batch_size = 16;

    let baseline = HDR_ALLOCATOR.statistics();

    let barrier = sync::Arc::new(sync::Barrier::new(number_threads));
    let tallies = {
        let mut tallies = Vec::with_capacity(number_iterations);
        tallies.resize_with(number_iterations, || atomic::AtomicUsize::new(0));

        sync::Arc::new(tallies)
    };

    let pool = Pool::new(number_threads, |thread_index| {
        let barrier = barrier.clone();
        let tallies = tallies.clone();

        move || {
            let mut rng = StdRng::seed_from_u64(thread_index as u64);
            let mut last_peak = 0;

            for iteration in 0..number_iterations {
                let mut batch = Vec::with_capacity(batch_size);
                let mut held = 0;

                for _ in 0..batch_size {
                    let size = rng.gen_range(0..16_384);
                    let flags = if rng.gen() { Flags::CLEAR } else { Flags::NORMAL };

                    batch.push(Block::new(size, flags));
                    held += HEADER_SIZE + size;
                }

                tallies[iteration].fetch_add(held, atomic::Ordering::AcqRel);

                barrier.wait();

                let statistics = HDR_ALLOCATOR.statistics();

                assert!(statistics.peak_allocated >= statistics.total_allocated, "{:?}", statistics);
                assert!(statistics.peak_allocated >= last_peak, "{} < {}", statistics.peak_allocated, last_peak);

                last_peak = statistics.peak_allocated;

                barrier.wait();

                for block in batch.iter_mut() {
                    block.check();
                }

                drop(batch);
            }
        }
    });

    pool.join();

    let lower_bound = tallies.iter().map(|tally| tally.load(atomic::Ordering::Acquire)).max().unwrap_or(0);

    let statistics = HDR_ALLOCATOR.statistics();

    assert_eq!(baseline.total_allocated, statistics.total_allocated);
    assert_eq!(baseline.allocation_count, statistics.allocation_count);
    assert!(statistics.peak_allocated >= baseline.total_allocated + lower_bound,
        "{} < {} + {}", statistics.peak_allocated, baseline.total_allocated, lower_bound);
}

#[serial]
#[test]
fn reallocate_concurrently() {
    //  Test that blocks can be concurrently reallocated, preserving their content, and that the peak never falls
    //  behind the total while resizes interleave.

    let number_iterations = number_iterations();
    let number_threads = number_threads();

    let baseline = HDR_ALLOCATOR.statistics();

    let pool = Pool::new(number_threads, |thread_index| {
        move || {
            let mut rng = StdRng::seed_from_u64(0x5EED + thread_index as u64);
            let mut block = Block::new(rng.gen_range(1..1_024), Flags::NORMAL);
            let mut last_peak = 0;

            for _ in 0..(number_iterations * 16) {
                block.resize(rng.gen_range(0..65_536));

                let statistics = HDR_ALLOCATOR.statistics();

                assert!(statistics.peak_allocated >= statistics.total_allocated, "{:?}", statistics);
                assert!(statistics.peak_allocated >= last_peak, "{} < {}", statistics.peak_allocated, last_peak);
                assert!(statistics.peak_allocated >= HEADER_SIZE + block.size, "{:?}", statistics);

                last_peak = statistics.peak_allocated;
            }
        }
    });

    pool.join();

    let statistics = HDR_ALLOCATOR.statistics();

    assert_eq!(baseline.total_allocated, statistics.total_allocated);
    assert_eq!(baseline.allocation_count, statistics.allocation_count);
}

#[serial]
#[test]
fn producer_consumer() {
    //  Test that blocks allocated on one thread can be deallocated on another.

    let number_iterations = number_iterations();
    let number_victims = 256;

    let baseline = HDR_ALLOCATOR.statistics();

    let (sender, receiver) = sync::mpsc::sync_channel::<Block>(16);

    let producer = thread::spawn(move || {
        for i in 0..(number_iterations * number_victims) {
            sender.send(Block::new(i % 4_096, Flags::CLEAR)).expect("Sent");
        }
    });

    let consumer = thread::spawn(move || {
        let mut received = 0;

        for mut block in receiver.iter() {
            block.check();
            received += 1;
        }

        received
    });

    producer.join().unwrap();

    assert_eq!(number_iterations * number_victims, consumer.join().unwrap());

    let statistics = HDR_ALLOCATOR.statistics();

    assert_eq!(baseline.total_allocated, statistics.total_allocated);
    assert_eq!(baseline.allocation_count, statistics.allocation_count);
}

//
//  Multi-threaded helpers
//

struct Pool<T>(Vec<thread::JoinHandle<T>>);

impl<T> Pool<T> {
    fn new<F, G>(count: usize, mut factory: F) -> Self
        where
            F: FnMut(usize) -> G,
            G: FnOnce() -> T + Send + 'static,
            T: Send + 'static
    {
        let threads : Vec<_> = (0..count)
            .map(|i| {
                thread::spawn(factory(i))
            })
            .collect();

        Self(threads)
    }

    fn join(mut self) -> Vec<T> {
        let thread_handles = std::mem::replace(&mut self.0, vec!());
        Self::join_handles(thread_handles)
    }

    fn join_handles(thread_handles: Vec<thread::JoinHandle<T>>) -> Vec<T> {
        //  First join _all_ threads.
        let results: Vec<_> = thread_handles.into_iter()
            .map(|handle| handle.join())
            .collect();
        //  Then collect the results.
        results.into_iter()
            .map(|value| value.unwrap())
            .collect()
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        let thread_handles = std::mem::replace(&mut self.0, vec!());
        Self::join_handles(thread_handles);
    }
}

//
//  Implementation Details
//

fn number_iterations() -> usize { read_number_from_environment("HDRALLOC_MULTI_NUMBER_ITERATIONS", 10) }

fn number_threads() -> usize {
    read_number_from_environment("HDRALLOC_MULTI_NUMBER_THREADS", num_cpus::get().max(2).min(8))
}

fn read_number_from_environment(name: &str, default: usize) -> usize {
    for (n, value) in std::env::vars() {
        if n == name {
            if let Ok(result) = value.parse() {
                println!("read_number_from_environment - {}: {}", name, result);
                return result;
            }
        }
    }

    println!("read_number_from_environment - {}: {} (default)", name, default);
    default
}

//  A block filled with a pattern derived from its address and size, freed on drop.
struct Block {
    pointer: NonNull<u8>,
    size: usize,
}

impl Block {
    fn new(size: usize, flags: Flags) -> Self {
        let pointer = HDR_ALLOCATOR.allocate(size, flags).expect("Allocated");

        if flags.contains(Flags::CLEAR) {
            assert!(unsafe { std::slice::from_raw_parts(pointer.as_ptr(), size) }.iter().all(|&b| b == 0));
        }

        let mut block = Block { pointer, size };
        block.fill();
        block
    }

    fn resize(&mut self, new_size: usize) {
        let preserved = self.size.min(new_size);
        let seed = self.seed();

        self.pointer = unsafe { HDR_ALLOCATOR.reallocate(self.pointer.as_ptr(), new_size) }.expect("Reallocated");
        self.size = new_size;

        let bytes = self.bytes();

        for (i, byte) in bytes[..preserved].iter().enumerate() {
            assert_eq!(pattern(seed, i), *byte, "index {} of {}", i, preserved);
        }

        self.fill();
    }

    fn check(&mut self) {
        let (seed, size) = (self.seed(), self.size);

        for (i, byte) in self.bytes().iter().enumerate() {
            assert_eq!(pattern(seed, i), *byte, "index {} of {}", i, size);
        }
    }

    fn fill(&mut self) {
        let seed = self.seed();

        for (i, byte) in self.bytes().iter_mut().enumerate() {
            *byte = pattern(seed, i);
        }
    }

    fn seed(&self) -> usize { self.pointer.as_ptr() as usize ^ self.size }

    fn bytes(&mut self) -> &mut [u8] { unsafe { std::slice::from_raw_parts_mut(self.pointer.as_ptr(), self.size) } }
}

impl Drop for Block {
    fn drop(&mut self) {
        unsafe { HDR_ALLOCATOR.deallocate(self.pointer.as_ptr()) };
    }
}

unsafe impl Send for Block {}

fn pattern(seed: usize, index: usize) -> u8 { (seed.wrapping_mul(31).wrapping_add(index) % 251) as u8 }
