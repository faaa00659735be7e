/// A driver object owned by exactly one Rust value.
///
/// The handle is created in the constructor and never reassigned. The
/// driver-side delete is issued from `Drop`, so it happens once no matter
/// whether the owner calls [`GpuResource::delete`] or just lets it go.
pub trait GpuResource {
    fn handle(&self) -> u32;

    /// Binds the object to its target.
    fn activate(&self);

    /// Unbinds whatever is bound to the object's target.
    fn deactivate(&self);

    fn delete(self)
    where
        Self: Sized,
    {
        drop(self)
    }
}
