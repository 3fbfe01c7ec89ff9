//! Query-side access shared by the listing views.

pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rows currently listed. Reads without waiting and reports zero while a
    /// catch-up holds the view.
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
