mod allocation;
mod deep_copy;
mod status_markers;
mod trajectory_progress;
