//! Components advanced by the pixel clock.

use crate::Ticks;

/// A component advanced one pixel clock at a time.
///
/// Pixel-domain components (timing generator, the whole controller) implement
/// this. Components clocked faster than the pixel clock do their extra work
/// inside `tick()`.
pub trait Tickable {
    /// Advance by one pixel clock.
    fn tick(&mut self);

    /// Advance by `count` pixel clocks. Must behave exactly like calling
    /// `tick()` `count` times.
    fn tick_n(&mut self, count: Ticks) {
        (0..count.get()).for_each(|_| self.tick());
    }

    /// Return to power-on state.
    fn reset(&mut self);
}
