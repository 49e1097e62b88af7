use huddle_core::PeerId;

/// On crossing offers the side whose own id sorts after the remote's rolls
/// back and answers. Both sides evaluate this with swapped arguments, so
/// exactly one of them yields.
pub fn yields_on_glare(local: PeerId, remote: PeerId) -> bool {
    local > remote
}
