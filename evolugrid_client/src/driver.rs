//! Async glue between a [GridController] and a [Transport].
//!
//! A driver runs one fetch at a time to completion. Hosts that want several
//! requests in flight at once drive the controller by hand instead.

use crate::controller::{GridCommand, GridController};
use crate::transport::{FetchRequest, Transport};

pub struct GridDriver<T: Transport> {
    controller: GridController,
    transport: T,
}

impl<T: Transport> GridDriver<T> {
    pub fn new(controller: GridController, transport: T) -> Self {
        Self {
            controller,
            transport,
        }
    }

    pub fn controller(&self) -> &GridController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut GridController {
        &mut self.controller
    }

    pub fn into_inner(self) -> (GridController, T) {
        (self.controller, self.transport)
    }

    /// Perform a fetch issued by the controller and report the outcome.
    /// Returns true if the response was rendered.
    pub async fn run(&mut self, request: Option<FetchRequest>) -> bool {
        let Some(request) = request else {
            return false;
        };

        let result = self.transport.fetch(&request.url).await;
        self.controller.complete(request.ticket, result)
    }

    /// Dispatch a command, then run the fetch it issued, if any.
    pub async fn execute(&mut self, command: GridCommand) -> bool {
        let request = self.controller.dispatch(command);
        self.run(request).await
    }
}
