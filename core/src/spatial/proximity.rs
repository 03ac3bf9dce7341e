use crate::math::Vec3;

/// Another player that may be within hearing range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peer {
    pub id: u64,
    pub position: Vec3,
    pub dead: bool,
}

/// Peers whose alive/dead state matches the listener's and that are within
/// `max_distance`, nearest first. The listener's own id is skipped.
pub fn nearest_peers(
    listener_id: u64,
    listener_position: Vec3,
    listener_dead: bool,
    peers: &[Peer],
    max_distance: f32,
) -> Vec<(u64, f32)> {
    let mut found: Vec<(u64, f32)> = peers
        .iter()
        .filter(|peer| peer.id != listener_id && peer.dead == listener_dead)
        .filter_map(|peer| {
            let distance = listener_position.distance(peer.position);
            (distance.is_finite() && distance <= max_distance).then_some((peer.id, distance))
        })
        .collect();
    found.sort_by(|a, b| a.1.total_cmp(&b.1));
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: u64, x: f32, dead: bool) -> Peer {
        Peer {
            id,
            position: Vec3::new(x, 0.0, 0.0),
            dead,
        }
    }

    #[test]
    fn nearest_peers_are_sorted_and_filtered() {
        let peers = [
            peer(0, 0.0, false),
            peer(1, 9.0, false),
            peer(2, 3.0, false),
            peer(3, 1.0, true),
            peer(4, 40.0, false),
        ];
        let found = nearest_peers(0, Vec3::ZERO, false, &peers, 10.0);
        assert_eq!(found, vec![(2, 3.0), (1, 9.0)]);
    }

    #[test]
    fn dead_listeners_only_hear_the_dead() {
        let peers = [peer(1, 2.0, false), peer(2, 5.0, true)];
        let found = nearest_peers(0, Vec3::ZERO, true, &peers, 10.0);
        assert_eq!(found, vec![(2, 5.0)]);
    }
}
