use rtpool_api::RtResult;
use std::collections::VecDeque;
use std::num::Wrapping;

struct DropSinkResourceInFlight<T> {
    resource: T,
    live_until_frame: Wrapping<u32>,
}

/// Holds released device resources until enough frames have passed that the GPU can no longer be
/// using them, then hands them to a destroy callback.
///
/// Resources retired during frame N are destroyed when the frame advances to N + 1 +
/// max_in_flight_frames. The sink never talks to the device itself, the caller provides the
/// destroy function so the sink can be tested without one.
pub struct ResourceDropSink<T> {
    // All resources live for the same number of frames, so the queue is ordered by
    // live_until_frame and only ever drained from the front
    resources_in_flight: VecDeque<DropSinkResourceInFlight<T>>,

    max_in_flight_frames: Wrapping<u32>,

    // Incremented when on_frame_complete is called
    frame_index: Wrapping<u32>,
}

impl<T> ResourceDropSink<T> {
    pub fn new(max_in_flight_frames: u32) -> Self {
        ResourceDropSink {
            resources_in_flight: Default::default(),
            max_in_flight_frames: Wrapping(max_in_flight_frames),
            frame_index: Wrapping(0),
        }
    }

    /// Schedule the resource to be destroyed once the current frame and N more have completed
    pub fn retire(
        &mut self,
        resource: T,
    ) {
        self.resources_in_flight
            .push_back(DropSinkResourceInFlight::<T> {
                resource,
                live_until_frame: self.frame_index + self.max_in_flight_frames + Wrapping(1),
            });
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index.0
    }

    pub fn len(&self) -> usize {
        self.resources_in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources_in_flight.is_empty()
    }

    /// Advance the frame and destroy everything whose time has come. All expired resources are
    /// handed to `destroy_fn` even if one of them fails, the first error is returned.
    pub fn on_frame_complete<F: FnMut(T) -> RtResult<()>>(
        &mut self,
        mut destroy_fn: F,
    ) -> RtResult<()> {
        self.frame_index += Wrapping(1);

        let mut resources_to_drop = 0;
        for resource_in_flight in &self.resources_in_flight {
            // Once frame_index reaches live_until_frame the difference is small, before that it
            // wraps around to a value near u32::MAX
            if (self.frame_index - resource_in_flight.live_until_frame).0 < std::u32::MAX / 2 {
                resources_to_drop += 1;
            } else {
                break;
            }
        }

        let mut result = Ok(());
        for resource_in_flight in self.resources_in_flight.drain(0..resources_to_drop) {
            let destroy_result = (destroy_fn)(resource_in_flight.resource);
            if result.is_ok() {
                result = destroy_result;
            }
        }

        result
    }

    /// Immediately destroy everything. The device must be idle.
    pub fn destroy<F: FnMut(T) -> RtResult<()>>(
        &mut self,
        mut destroy_fn: F,
    ) -> RtResult<()> {
        let mut result = Ok(());
        for resource_in_flight in self.resources_in_flight.drain(..) {
            let destroy_result = (destroy_fn)(resource_in_flight.resource);
            if result.is_ok() {
                result = destroy_result;
            }
        }

        result
    }
}

// We assume destroy was called
impl<T> Drop for ResourceDropSink<T> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert!(self.resources_in_flight.is_empty())
        }
    }
}
